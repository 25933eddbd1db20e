//! # Position Session
//!
//! Draft state of one "add liquidity" form: the selected range, the
//! denomination prices are shown in, the amount being typed and the
//! transaction plan. Context changes (switching the active token, switching
//! pools, closing the form) cancel everything in flight.

use std::sync::Arc;

use range_core::{
    boosted_apr, detect_preset, preset_to_range, price_to_tick, tick_to_price, BoostedApr, CapitalEfficiency,
    Denomination, PoolPriceContext, Preset, PriceRange, PriceSide, RangeBound, RangeCoreError, TickGrid, TokenSide,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::amount::{AmountInput, CalculationOutcome, DependentAmountCalculator, DependentAmountState};
use crate::config::ManagerConfig;
use crate::error::{PositionError, PositionResult};
use crate::pool_state::PoolStateWatcher;
use crate::ports::{ApprovalProvider, LiquidityMathService, PoolStateProvider, Signer};
use crate::transaction::{AdvanceOutcome, MachineSnapshot, StepKind, TransactionStepMachine};
use crate::types::{DepositParams, PoolKey, PositionAction};

/// External services a session talks to
#[derive(Clone)]
pub struct ServiceSet {
    pub pools: Arc<dyn PoolStateProvider>,
    pub math: Arc<dyn LiquidityMathService>,
    pub approvals: Arc<dyn ApprovalProvider>,
    pub signer: Arc<dyn Signer>,
}

pub struct PositionSession {
    config: ManagerConfig,
    services: ServiceSet,
    pool: PoolKey,
    grid: TickGrid,
    watcher: PoolStateWatcher,
    calculator: DependentAmountCalculator,
    machine: TransactionStepMachine,
    denomination: Denomination,
    active_side: TokenSide,
    range: Option<PriceRange>,
    /// Last typed amount, replayed when the range changes
    amount: Option<String>,
}

impl PositionSession {
    pub fn new(pool: PoolKey, services: ServiceSet, config: ManagerConfig) -> PositionResult<Self> {
        let grid = TickGrid::new(pool.tick_spacing)?;
        let watcher = Self::watcher_for(&pool, &services, &config);
        let calculator = DependentAmountCalculator::from_config(pool.clone(), Arc::clone(&services.math), &config);
        let machine =
            TransactionStepMachine::from_config(Arc::clone(&services.approvals), Arc::clone(&services.signer), &config);
        let denomination = Denomination::natural(&pool.token0, &pool.token1, None);

        info!(pool = %pool.pool_id, tick_spacing = pool.tick_spacing, "Opened position session");
        Ok(Self {
            config,
            services,
            pool,
            grid,
            watcher,
            calculator,
            machine,
            denomination,
            active_side: TokenSide::Token0,
            range: None,
            amount: None,
        })
    }

    fn watcher_for(pool: &PoolKey, services: &ServiceSet, config: &ManagerConfig) -> PoolStateWatcher {
        PoolStateWatcher::new(
            Arc::clone(&services.pools),
            pool.pool_id.clone(),
            config.pool_poll_interval(),
            config.service_timeout(),
        )
    }

    pub fn pool(&self) -> &PoolKey {
        &self.pool
    }

    pub fn grid(&self) -> &TickGrid {
        &self.grid
    }

    pub fn range(&self) -> Option<PriceRange> {
        self.range
    }

    pub fn active_side(&self) -> TokenSide {
        self.active_side
    }

    pub fn denomination(&self) -> Denomination {
        self.denomination
    }

    pub fn watcher(&self) -> &PoolStateWatcher {
        &self.watcher
    }

    pub fn calculator(&self) -> &DependentAmountCalculator {
        &self.calculator
    }

    pub fn start_watching(&self) {
        self.watcher.start();
    }

    /// Fetch the pool now; the first snapshot also settles the natural denomination
    pub async fn refresh_pool(&mut self) -> PositionResult<()> {
        let first = self.watcher.latest().is_none();
        let state = self.watcher.refresh_now().await?;
        if let (true, Some(state)) = (first, state) {
            let price = state.price().ok();
            self.denomination = Denomination::natural(&self.pool.token0, &self.pool.token1, price);
        }
        Ok(())
    }

    pub fn set_denomination(&mut self, denomination: Denomination) {
        self.denomination = denomination;
    }

    pub fn flip_denomination(&mut self) {
        self.denomination = self.denomination.flip();
    }

    /// Pool anchor for range math. The math service's view wins when it was
    /// reported after the watcher's last snapshot.
    fn price_context(&self) -> PositionResult<PoolPriceContext> {
        let calculated = self.calculator.snapshot();
        if let (Some(tick), Some(price), Some(at)) =
            (calculated.pool_tick, calculated.pool_price.as_deref(), calculated.pool_observed_at)
        {
            let newer = self.watcher.observed_at().map_or(true, |watched| at > watched);
            let ctx = price.parse().ok().and_then(|price| PoolPriceContext::new(tick, price).ok());
            if let (true, Some(ctx)) = (newer, ctx) {
                return Ok(ctx);
            }
        }
        self.watcher.price_context()
    }

    fn pool_tick(&self) -> PositionResult<i32> {
        Ok(self.price_context()?.pool_tick)
    }

    fn current_range(&self) -> PositionResult<PriceRange> {
        self.range
            .ok_or_else(|| PositionError::InvalidInput("no price range selected".to_string()))
    }

    /// Select a preset around the current pool tick. A collapsed range leaves
    /// the previous selection in place.
    pub fn apply_preset(&mut self, preset: Preset) -> PositionResult<PriceRange> {
        let range = preset_to_range(preset, self.pool_tick()?, &self.grid)?;
        debug!(preset = %preset.label(), lower = range.tick_lower, upper = range.tick_upper, "Applied preset");
        self.set_range(range);
        Ok(range)
    }

    /// Edit the displayed min or max price
    pub fn set_price_bound(&mut self, side: PriceSide, input: &str) -> PositionResult<PriceRange> {
        let ctx = self.price_context()?;
        let bound = self.denomination.bound_for(side);
        let tick = price_to_tick(input, bound, self.denomination, &self.grid, &ctx)?;

        let current = self
            .range
            .unwrap_or_else(|| PriceRange::full(self.grid.min_tick, self.grid.max_tick));
        let range = current.with_bound(bound, tick).map_err(|err| match err {
            RangeCoreError::InvalidRange { lower, upper } => PositionError::RangeTooNarrow(format!(
                "bounds {lower} and {upper} leave less than one tick spacing"
            )),
            other => other.into(),
        })?;

        self.set_range(range);
        Ok(range)
    }

    pub fn set_range(&mut self, range: PriceRange) {
        self.range = Some(range);
        self.machine.reset();
        if let Some(amount) = self.amount.clone() {
            // Replayed in the background; results arrive through the calculator state
            drop(self.calculator.submit(AmountInput::new(self.active_side, amount, &range)));
        }
    }

    /// Displayed min or max price of the selected range
    pub fn display_price(&self, side: PriceSide) -> PositionResult<String> {
        let ctx = self.price_context()?;
        let range = self.current_range()?;
        let tick = match self.denomination.bound_for(side) {
            RangeBound::Lower => range.tick_lower,
            RangeBound::Upper => range.tick_upper,
        };
        let quote = self.denomination.quote_token(&self.pool.token0, &self.pool.token1);
        let policy = self.config.formatting.price_policy(quote, self.pool.kind);
        Ok(tick_to_price(tick, &ctx, self.denomination, &self.grid, &policy))
    }

    /// Preset matching the selected range, recomputed from the current pool tick
    pub fn current_preset(&self) -> PositionResult<Option<Preset>> {
        Ok(detect_preset(&self.current_range()?, self.pool_tick()?, &self.grid))
    }

    pub fn capital_efficiency(&self) -> PositionResult<CapitalEfficiency> {
        Ok(CapitalEfficiency::for_range(&self.current_range()?, self.pool_tick()?, &self.grid))
    }

    pub fn boosted_apr(&self, base_apr: f64) -> PositionResult<BoostedApr> {
        let range = self.current_range()?;
        let pool_tick = self.pool_tick()?;
        let efficiency = CapitalEfficiency::for_range(&range, pool_tick, &self.grid);
        let full = range.is_full_range(self.grid.min_tick, self.grid.max_tick);
        Ok(boosted_apr(base_apr, efficiency.multiplier, pool_tick, &range, full))
    }

    /// Type an amount for `side`; editing the other field switches the active side first
    pub fn edit_amount(&mut self, side: TokenSide, amount: &str) -> PositionResult<JoinHandle<CalculationOutcome>> {
        let range = self.current_range()?;
        if side != self.active_side {
            self.switch_active_side(side);
        }
        self.amount = Some(amount.to_string());
        self.machine.reset();
        Ok(self.calculator.submit(AmountInput::new(side, amount, &range)))
    }

    pub fn switch_active_side(&mut self, side: TokenSide) {
        debug!(from = ?self.active_side, to = ?side, "Switching active token");
        self.active_side = side;
        self.amount = None;
        self.calculator.invalidate();
        self.machine.reset();
    }

    /// Move the form to another pool, dropping all draft state
    pub fn change_pool(&mut self, pool: PoolKey) -> PositionResult<()> {
        let grid = TickGrid::new(pool.tick_spacing)?;
        self.close();

        self.watcher = Self::watcher_for(&pool, &self.services, &self.config);
        self.calculator =
            DependentAmountCalculator::from_config(pool.clone(), Arc::clone(&self.services.math), &self.config);
        self.denomination = Denomination::natural(&pool.token0, &pool.token1, None);
        self.grid = grid;
        self.range = None;
        self.active_side = TokenSide::Token0;
        info!(pool = %pool.pool_id, "Changed pool");
        self.pool = pool;
        Ok(())
    }

    /// Cancel everything in flight
    pub fn close(&mut self) {
        self.amount = None;
        self.calculator.invalidate();
        self.machine.reset();
        self.watcher.stop();
    }

    pub fn amount_state(&self) -> DependentAmountState {
        self.calculator.snapshot()
    }

    /// Deposit parameters from the latest applied calculation
    pub fn deposit_params(&self, owner: &str) -> PositionResult<DepositParams> {
        let state = self.calculator.snapshot();
        if state.pending {
            return Err(PositionError::InvalidInput("calculation still pending".to_string()));
        }
        let result = state
            .result
            .ok_or_else(|| PositionError::InvalidInput("no calculated amounts".to_string()))?;

        Ok(DepositParams {
            pool_id: self.pool.pool_id.clone(),
            chain_id: self.pool.chain_id,
            tick_lower: result.final_tick_lower,
            tick_upper: result.final_tick_upper,
            liquidity: result.liquidity,
            amount0: result.amount0,
            amount1: result.amount1,
            owner: owner.to_string(),
        })
    }

    pub async fn prepare_transaction(&self, owner: &str) -> PositionResult<Vec<StepKind>> {
        let action = PositionAction {
            token0: self.pool.token0.clone(),
            token1: self.pool.token1.clone(),
            deposit: self.deposit_params(owner)?,
        };
        self.machine.prepare(action).await
    }

    pub async fn advance(&self) -> PositionResult<AdvanceOutcome> {
        self.machine.advance().await
    }

    pub fn transaction_snapshot(&self) -> MachineSnapshot {
        self.machine.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pool_key, pool_state, FakeMath, FakePools, FakeWallet};
    use range_core::PoolKind;
    use std::time::Duration;

    struct Harness {
        pools: Arc<FakePools>,
        math: Arc<FakeMath>,
        wallet: Arc<FakeWallet>,
    }

    impl Harness {
        fn new(pool_tick: i32) -> Self {
            Self {
                pools: Arc::new(FakePools::with_state(pool_state(pool_tick))),
                math: Arc::new(FakeMath::default()),
                wallet: Arc::new(FakeWallet::new(false, false, false)),
            }
        }

        fn services(&self) -> ServiceSet {
            ServiceSet {
                pools: self.pools.clone(),
                math: self.math.clone(),
                approvals: self.wallet.clone(),
                signer: self.wallet.clone(),
            }
        }

        async fn session(&self) -> PositionSession {
            let mut session = PositionSession::new(pool_key(), self.services(), ManagerConfig::default()).unwrap();
            session.refresh_pool().await.unwrap();
            session
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_preset_and_efficiency() {
        let harness = Harness::new(0);
        let mut session = harness.session().await;

        let range = session.apply_preset(Preset::Percentage(0.15)).unwrap();
        assert_eq!((range.tick_lower, range.tick_upper), (-1440, 1440));
        assert_eq!(session.current_preset().unwrap(), Some(Preset::Percentage(0.15)));
        assert!((session.capital_efficiency().unwrap().multiplier - 3.33).abs() < 0.01);

        let apr = session.boosted_apr(10.0).unwrap();
        assert!(!apr.out_of_range);
        assert!(apr.value > 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_bound_edit() {
        let harness = Harness::new(0);
        let mut session = harness.session().await;
        session.apply_preset(Preset::Percentage(0.15)).unwrap();

        // WETH/USDC priced in USDC (token1)
        assert_eq!(session.denomination(), Denomination::Token1);
        let range = session.set_price_bound(PriceSide::Max, "1.2").unwrap();
        assert_eq!(range.tick_lower, -1440);
        assert!(session.grid().is_aligned(range.tick_upper));
        assert_eq!(session.current_preset().unwrap(), None);

        let shown: f64 = session.display_price(PriceSide::Max).unwrap().parse().unwrap();
        assert!((shown - 1.2).abs() < 0.01);

        let collapsed = session.set_price_bound(PriceSide::Max, "0.5");
        assert!(matches!(collapsed, Err(PositionError::RangeTooNarrow(_))));
        assert_eq!(session.range(), Some(range));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stable_pool_presets_and_denomination() {
        let harness = Harness::new(0);
        let pool = PoolKey {
            kind: PoolKind::Stable,
            tick_spacing: 1,
            ..pool_key()
        };
        let mut session = PositionSession::new(pool, harness.services(), ManagerConfig::default()).unwrap();
        assert!(session.apply_preset(Preset::Percentage(0.001)).is_err());

        session.refresh_pool().await.unwrap();
        let range = session.apply_preset(Preset::Percentage(0.001)).unwrap();
        assert_eq!((range.tick_lower, range.tick_upper), (-10, 10));

        session.flip_denomination();
        assert_eq!(session.denomination(), Denomination::Token0);
        // Min of the inverted view is 1.0001^-10 in WETH per USDC
        assert_eq!(session.display_price(PriceSide::Min).unwrap(), "0.999");
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_side_invalidates() {
        let harness = Harness::new(0);
        let mut session = harness.session().await;
        session.apply_preset(Preset::FullRange).unwrap();

        let pending = session.edit_amount(TokenSide::Token0, "1").unwrap();
        session.switch_active_side(TokenSide::Token1);

        assert!(matches!(pending.await.unwrap(), CalculationOutcome::Superseded(_)));
        assert_eq!(harness.math.call_count(), 0);
        assert!(session.amount_state().result.is_none());
        assert!(session.deposit_params("0xowner").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_range_change_replays_amount() {
        let harness = Harness::new(0);
        let mut session = harness.session().await;
        session.apply_preset(Preset::Percentage(0.08)).unwrap();

        session.edit_amount(TokenSide::Token1, "100").unwrap().await.unwrap();
        let range = session.apply_preset(Preset::Percentage(0.15)).unwrap();
        tokio::time::sleep(ManagerConfig::default().debounce() * 2).await;

        let params = session.deposit_params("0xowner").unwrap();
        assert_eq!((params.tick_lower, params.tick_upper), (range.tick_lower, range.tick_upper));
        assert_eq!(params.amount1, "100000000");
        assert_eq!(harness.math.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_tick_follows_newest_observation() {
        let harness = Harness::new(0);
        let mut session = harness.session().await;
        session.apply_preset(Preset::Percentage(0.15)).unwrap();
        assert!(!session.boosted_apr(10.0).unwrap().out_of_range);

        // The price moved past the range; the math service sees it before the next poll
        harness.math.pool_tick.store(1500, std::sync::atomic::Ordering::SeqCst);
        session.edit_amount(TokenSide::Token0, "1").unwrap().await.unwrap();
        assert!(session.boosted_apr(10.0).unwrap().out_of_range);
        assert_eq!(session.current_preset().unwrap(), None);

        // A later poll takes over again
        tokio::time::sleep(Duration::from_millis(5)).await;
        session.refresh_pool().await.unwrap();
        assert!(!session.boosted_apr(10.0).unwrap().out_of_range);
        assert_eq!(session.current_preset().unwrap(), Some(Preset::Percentage(0.15)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deposit_flow() {
        let harness = Harness::new(0);
        let mut session = harness.session().await;
        session.apply_preset(Preset::Percentage(0.03)).unwrap();
        session.edit_amount(TokenSide::Token0, "0.5").unwrap().await.unwrap();

        assert_eq!(session.prepare_transaction("0xowner").await.unwrap(), vec![StepKind::Deposit]);
        assert!(matches!(session.advance().await.unwrap(), AdvanceOutcome::Completed(_)));
        assert_eq!(harness.wallet.log(), vec!["deposit"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_pool_resets() {
        let harness = Harness::new(0);
        let mut session = harness.session().await;
        session.apply_preset(Preset::Percentage(0.03)).unwrap();
        session.edit_amount(TokenSide::Token0, "1").unwrap().await.unwrap();
        session.prepare_transaction("0xowner").await.unwrap();

        let next = PoolKey {
            pool_id: "weth-usdc-500".to_string(),
            tick_spacing: 10,
            ..pool_key()
        };
        session.change_pool(next).unwrap();

        assert_eq!(session.pool().pool_id, "weth-usdc-500");
        assert_eq!(session.grid().tick_spacing, 10);
        assert!(session.range().is_none());
        assert!(session.amount_state().result.is_none());
        assert!(session.transaction_snapshot().steps.is_empty());
        assert!(session.watcher().latest().is_none());
    }
}
