//! # Dependent Amount Calculator
//!
//! Given the amount the user typed for one token, derives the paired amount of
//! the other token from the liquidity math service.
//!
//! Each edit is tagged with a monotonically increasing generation. Requests
//! wait out a debounce period first. A response is applied only if its
//! generation is still the latest one when it arrives; anything older is
//! dropped without touching published state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use range_core::{format_token_amount, parse_units, DisplayAmount, PriceRange, TokenSide};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ManagerConfig;
use crate::error::{PositionError, PositionResult};
use crate::ports::{LiquidityMathService, PortError};
use crate::types::{CalculationRequest, DependentAmountResult, PoolKey};

const SERVICE: &str = "liquidity math";

/// One edit of an amount field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountInput {
    pub active: TokenSide,
    /// Decimal text as typed
    pub amount: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl AmountInput {
    pub fn new(active: TokenSide, amount: impl Into<String>, range: &PriceRange) -> Self {
        Self {
            active,
            amount: amount.into(),
            tick_lower: range.tick_lower,
            tick_upper: range.tick_upper,
        }
    }
}

/// Published calculator state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependentAmountState {
    /// Generation of the latest accepted edit
    pub generation: u64,
    /// A request for `generation` is waiting or in flight
    pub pending: bool,
    pub active: Option<TokenSide>,
    pub result: Option<DependentAmountResult>,
    /// The other token's amount, formatted for display
    pub dependent_amount: Option<DisplayAmount>,
    pub pool_tick: Option<i32>,
    pub pool_price: Option<String>,
    /// When the service reported `pool_tick` and `pool_price`
    pub pool_observed_at: Option<Instant>,
    pub error: Option<PositionError>,
}

/// How one submitted edit ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculationOutcome {
    /// Blank or zero input; outputs cleared without a service call
    Cleared,
    /// Unusable input; outputs cleared without a service call
    Invalid(PositionError),
    Applied(DependentAmountResult),
    /// A newer edit arrived first; nothing was published
    Superseded(u64),
    Failed(PositionError),
}

impl CalculationOutcome {
    pub fn into_result(self) -> PositionResult<Option<DependentAmountResult>> {
        match self {
            CalculationOutcome::Cleared => Ok(None),
            CalculationOutcome::Applied(result) => Ok(Some(result)),
            CalculationOutcome::Superseded(generation) => Err(PositionError::StaleResult(generation)),
            CalculationOutcome::Invalid(err) | CalculationOutcome::Failed(err) => Err(err),
        }
    }
}

enum Prepared {
    Done(CalculationOutcome),
    Scheduled {
        generation: u64,
        active: TokenSide,
        request: CalculationRequest,
    },
}

struct Inner {
    pool: PoolKey,
    service: Arc<dyn LiquidityMathService>,
    debounce: Duration,
    timeout: Duration,
    generation: AtomicU64,
    state: watch::Sender<DependentAmountState>,
}

pub struct DependentAmountCalculator {
    inner: Arc<Inner>,
}

impl DependentAmountCalculator {
    pub fn new(
        pool: PoolKey,
        service: Arc<dyn LiquidityMathService>,
        debounce: Duration,
        timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(DependentAmountState::default());
        Self {
            inner: Arc::new(Inner {
                pool,
                service,
                debounce,
                timeout,
                generation: AtomicU64::new(0),
                state,
            }),
        }
    }

    pub fn from_config(pool: PoolKey, service: Arc<dyn LiquidityMathService>, config: &ManagerConfig) -> Self {
        Self::new(pool, service, config.debounce(), config.service_timeout())
    }

    pub fn pool(&self) -> &PoolKey {
        &self.inner.pool
    }

    pub fn subscribe(&self) -> watch::Receiver<DependentAmountState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> DependentAmountState {
        self.inner.state.borrow().clone()
    }

    /// Latest generation handed out
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Accept an edit and resolve it in the background.
    ///
    /// The generation is bumped before this returns, so any earlier edit is
    /// already superseded even if its task has not run yet.
    pub fn submit(&self, input: AmountInput) -> JoinHandle<CalculationOutcome> {
        match self.inner.prepare(input) {
            Prepared::Done(outcome) => tokio::spawn(async move { outcome }),
            Prepared::Scheduled {
                generation,
                active,
                request,
            } => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move { inner.run(generation, active, request).await })
            }
        }
    }

    /// Accept an edit and resolve it on the current task
    pub async fn calculate(&self, input: AmountInput) -> CalculationOutcome {
        match self.inner.prepare(input) {
            Prepared::Done(outcome) => outcome,
            Prepared::Scheduled {
                generation,
                active,
                request,
            } => self.inner.run(generation, active, request).await,
        }
    }

    /// Supersede everything in flight and clear the outputs
    pub fn invalidate(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, pool = %self.inner.pool.pool_id, "Invalidating dependent amount");
        self.inner.publish_cleared(generation, None);
    }
}

impl Inner {
    fn prepare(&self, input: AmountInput) -> Prepared {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.pool.token(input.active);
        let text = input.amount.trim();

        let raw = if text.is_empty() {
            Ok(0)
        } else {
            parse_units(text, token.decimals).map_err(PositionError::from)
        };

        let raw = match raw {
            Ok(0) => {
                self.publish_cleared(generation, Some(input.active));
                return Prepared::Done(CalculationOutcome::Cleared);
            }
            Ok(raw) => raw,
            Err(err) => {
                debug!(generation, input = text, "Unusable amount input: {}", err);
                self.publish_cleared(generation, Some(input.active));
                return Prepared::Done(CalculationOutcome::Invalid(err));
            }
        };

        if input.tick_lower >= input.tick_upper {
            let err = PositionError::InvalidInput(format!(
                "tick_lower {} must be below tick_upper {}",
                input.tick_lower, input.tick_upper
            ));
            self.publish_cleared(generation, Some(input.active));
            return Prepared::Done(CalculationOutcome::Invalid(err));
        }

        self.state.send_modify(|state| {
            state.generation = generation;
            state.pending = true;
            state.active = Some(input.active);
            state.result = None;
            state.dependent_amount = None;
            state.error = None;
        });

        Prepared::Scheduled {
            generation,
            active: input.active,
            request: CalculationRequest {
                token0: self.pool.token0.address.clone(),
                token1: self.pool.token1.address.clone(),
                input_amount: raw.to_string(),
                input_token: input.active,
                tick_lower: input.tick_lower,
                tick_upper: input.tick_upper,
                chain_id: self.pool.chain_id,
            },
        }
    }

    async fn run(&self, generation: u64, active: TokenSide, request: CalculationRequest) -> CalculationOutcome {
        tokio::time::sleep(self.debounce).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Edit superseded during debounce");
            return CalculationOutcome::Superseded(generation);
        }

        debug!(generation, input_token = ?active, amount = %request.input_amount, "Requesting dependent amount");
        let response = match tokio::time::timeout(self.timeout, self.service.calculate(&request)).await {
            Ok(response) => response,
            Err(_) => Err(PortError::Timeout),
        };
        let outcome = response
            .map_err(|e| PositionError::from_query(SERVICE, e))
            .and_then(|result| {
                let display = self.format_dependent(&result, active)?;
                Ok((result, display))
            });

        // Checked under the channel lock so a concurrent edit either wins
        // before this check or clears after the apply.
        let published = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.pending = false;
            match &outcome {
                Ok((result, display)) => {
                    state.pool_tick = Some(result.pool_tick_at_calc);
                    state.pool_price = Some(result.pool_price_at_calc.clone());
                    state.pool_observed_at = Some(Instant::now());
                    state.result = Some(result.clone());
                    state.dependent_amount = Some(display.clone());
                    state.error = None;
                }
                Err(err) => {
                    state.result = None;
                    state.dependent_amount = None;
                    state.pool_tick = None;
                    state.pool_price = None;
                    state.pool_observed_at = None;
                    state.error = Some(err.clone());
                }
            }
            true
        });

        if !published {
            debug!(generation, "Discarding stale dependent amount");
            return CalculationOutcome::Superseded(generation);
        }

        match outcome {
            Ok((result, _)) => CalculationOutcome::Applied(result),
            Err(err) => {
                warn!(generation, pool = %self.pool.pool_id, "Dependent amount failed: {}", err);
                CalculationOutcome::Failed(err)
            }
        }
    }

    fn format_dependent(&self, result: &DependentAmountResult, active: TokenSide) -> PositionResult<DisplayAmount> {
        let dependent = active.other();
        let text = result.amount(dependent);
        let raw: u128 = text.parse().map_err(|_| PositionError::ServiceFailure {
            service: SERVICE,
            reason: format!("malformed amount {text:?}"),
        })?;
        Ok(format_token_amount(raw, self.pool.token(dependent)))
    }

    fn publish_cleared(&self, generation: u64, active: Option<TokenSide>) {
        self.state.send_modify(|state| {
            *state = DependentAmountState {
                generation,
                active,
                ..DependentAmountState::default()
            };
        });
    }
}
