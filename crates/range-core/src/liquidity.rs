//! # Liquidity Estimates
//!
//! Floating-point versions of the concentrated liquidity amount formulas,
//! working on raw (not decimal-adjusted) prices so they line up with raw
//! token amounts. Good enough for previews; on-chain-exact numbers come from
//! the quote service.

use crate::constants::TICK_BASE;
use crate::errors::{CoreResult, RangeCoreError};
use crate::types::{PriceRange, TokenSide};

/// `sqrt(1.0001^tick)`
pub fn sqrt_price_at_tick(tick: i32) -> f64 {
    TICK_BASE.powf(tick as f64 / 2.0)
}

/// Liquidity provided by `amount0` between two sqrt prices
pub fn liquidity_for_amount0(sqrt_a: f64, sqrt_b: f64, amount0: f64) -> f64 {
    let (lo, hi) = ordered(sqrt_a, sqrt_b);
    amount0 * lo * hi / (hi - lo)
}

/// Liquidity provided by `amount1` between two sqrt prices
pub fn liquidity_for_amount1(sqrt_a: f64, sqrt_b: f64, amount1: f64) -> f64 {
    let (lo, hi) = ordered(sqrt_a, sqrt_b);
    amount1 / (hi - lo)
}

/// Token0 backing `liquidity` between two sqrt prices
pub fn amount0_for_liquidity(sqrt_a: f64, sqrt_b: f64, liquidity: f64) -> f64 {
    let (lo, hi) = ordered(sqrt_a, sqrt_b);
    liquidity * (hi - lo) / (lo * hi)
}

/// Token1 backing `liquidity` between two sqrt prices
pub fn amount1_for_liquidity(sqrt_a: f64, sqrt_b: f64, liquidity: f64) -> f64 {
    let (lo, hi) = ordered(sqrt_a, sqrt_b);
    liquidity * (hi - lo)
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Liquidity and both raw amounts for a one-sided input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityEstimate {
    pub liquidity: f64,
    pub amount0: u128,
    pub amount1: u128,
}

/// Pair `raw_amount` of `active` with the other token for `range` at `pool_tick`.
///
/// At or below the lower tick only token0 is deposited, and at or above the
/// upper tick only token1. Asking for the other side there is an error.
pub fn dependent_amount(
    active: TokenSide,
    raw_amount: u128,
    range: &PriceRange,
    pool_tick: i32,
) -> CoreResult<LiquidityEstimate> {
    if range.tick_lower >= range.tick_upper {
        return Err(RangeCoreError::InvalidRange {
            lower: range.tick_lower,
            upper: range.tick_upper,
        });
    }

    let sqrt_lower = sqrt_price_at_tick(range.tick_lower);
    let sqrt_upper = sqrt_price_at_tick(range.tick_upper);
    let amount = raw_amount as f64;

    let (liquidity, amount0, amount1) = if pool_tick <= range.tick_lower {
        if active != TokenSide::Token0 {
            return Err(RangeCoreError::SingleSided(TokenSide::Token0));
        }
        (liquidity_for_amount0(sqrt_lower, sqrt_upper, amount), amount, 0.0)
    } else if pool_tick >= range.tick_upper {
        if active != TokenSide::Token1 {
            return Err(RangeCoreError::SingleSided(TokenSide::Token1));
        }
        (liquidity_for_amount1(sqrt_lower, sqrt_upper, amount), 0.0, amount)
    } else {
        let sqrt_current = sqrt_price_at_tick(pool_tick);
        match active {
            TokenSide::Token0 => {
                let liquidity = liquidity_for_amount0(sqrt_current, sqrt_upper, amount);
                let amount1 = amount1_for_liquidity(sqrt_lower, sqrt_current, liquidity);
                (liquidity, amount, amount1)
            }
            TokenSide::Token1 => {
                let liquidity = liquidity_for_amount1(sqrt_lower, sqrt_current, amount);
                let amount0 = amount0_for_liquidity(sqrt_current, sqrt_upper, liquidity);
                (liquidity, amount0, amount)
            }
        }
    };

    Ok(LiquidityEstimate {
        liquidity,
        amount0: to_raw(amount0)?,
        amount1: to_raw(amount1)?,
    })
}

/// Floor a non-negative float into a raw amount
fn to_raw(value: f64) -> CoreResult<u128> {
    if !value.is_finite() || value < 0.0 {
        return Err(RangeCoreError::NonFinite);
    }
    if value >= u128::MAX as f64 {
        return Err(RangeCoreError::MathOverflow);
    }
    Ok(value.floor() as u128)
}
