//! In-process liquidity math.
//!
//! Answers dependent-amount requests from the current pool tick using the
//! float sqrt-price formulas in `range_core::liquidity`. Results are estimates
//! for when no remote quote endpoint is configured.

use std::sync::Arc;

use async_trait::async_trait;
use range_core::liquidity::dependent_amount;
use range_core::{PriceRange, RangeCoreError};

use crate::ports::{LiquidityMathService, PoolStateProvider, PortError, PortResult};
use crate::types::{CalculationRequest, DependentAmountResult};

pub struct LocalLiquidityMath {
    pools: Arc<dyn PoolStateProvider>,
    pool_id: String,
}

impl LocalLiquidityMath {
    pub fn new(pools: Arc<dyn PoolStateProvider>, pool_id: impl Into<String>) -> Self {
        Self {
            pools,
            pool_id: pool_id.into(),
        }
    }
}

fn provider_error(err: RangeCoreError) -> PortError {
    PortError::Provider(err.to_string())
}

#[async_trait]
impl LiquidityMathService for LocalLiquidityMath {
    async fn calculate(&self, request: &CalculationRequest) -> PortResult<DependentAmountResult> {
        let pool = self
            .pools
            .get_pool_state(&self.pool_id)
            .await?
            .ok_or_else(|| PortError::Provider(format!("pool {} not loaded", self.pool_id)))?;

        let raw_amount: u128 = request
            .input_amount
            .parse()
            .map_err(|_| PortError::Provider(format!("invalid input amount {:?}", request.input_amount)))?;
        let range = PriceRange::new(request.tick_lower, request.tick_upper).map_err(provider_error)?;

        let estimate = dependent_amount(request.input_token, raw_amount, &range, pool.tick).map_err(provider_error)?;

        Ok(DependentAmountResult {
            liquidity: format!("{:.0}", estimate.liquidity.floor()),
            final_tick_lower: range.tick_lower,
            final_tick_upper: range.tick_upper,
            amount0: estimate.amount0.to_string(),
            amount1: estimate.amount1.to_string(),
            pool_tick_at_calc: pool.tick,
            pool_price_at_calc: pool.price_token1_per_token0,
        })
    }
}
