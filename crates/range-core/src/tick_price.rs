//! # Tick Price Conversion
//!
//! Conversions between grid ticks and human-readable prices in either pool
//! token. Prices are anchored on the pool's current tick and decimal-adjusted
//! price, so `1.0001^(tick - pool_tick)` carries every conversion and token
//! decimals never enter the math directly.
//!
//! The outermost usable ticks are sentinels: the unbounded end renders as
//! `"∞"` and the other as `"0"`.

use crate::constants::{
    INFINITY_SYMBOL, MAX_TICK, MAX_TICK_SPACING, MIN_TICK, MIN_TICK_SPACING, TICK_BASE,
    TICK_SNAP_TOLERANCE,
};
use crate::denomination::Denomination;
use crate::errors::{CoreResult, RangeCoreError};
use crate::format::{format_price, PricePolicy};
use crate::types::{PoolState, RangeBound};

/// Usable tick bounds for a tick spacing, snapped inward to the grid
pub fn usable_tick_bounds(tick_spacing: i32) -> CoreResult<(i32, i32)> {
    if !(MIN_TICK_SPACING..=MAX_TICK_SPACING).contains(&tick_spacing) {
        return Err(RangeCoreError::InvalidTickSpacing(tick_spacing));
    }
    let min = -(MIN_TICK.abs() / tick_spacing) * tick_spacing;
    let max = (MAX_TICK / tick_spacing) * tick_spacing;
    Ok((min, max))
}

/// A pool's tick spacing together with its usable bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TickGrid {
    pub tick_spacing: i32,
    pub min_tick: i32,
    pub max_tick: i32,
}

impl TickGrid {
    /// Grid spanning the full protocol range
    pub fn new(tick_spacing: i32) -> CoreResult<Self> {
        let (min_tick, max_tick) = usable_tick_bounds(tick_spacing)?;
        Ok(Self {
            tick_spacing,
            min_tick,
            max_tick,
        })
    }

    /// Grid with explicit bounds, which must be aligned and ordered
    pub fn with_bounds(tick_spacing: i32, min_tick: i32, max_tick: i32) -> CoreResult<Self> {
        let (protocol_min, protocol_max) = usable_tick_bounds(tick_spacing)?;
        if min_tick % tick_spacing != 0 || min_tick < protocol_min {
            return Err(RangeCoreError::InvalidTick(min_tick));
        }
        if max_tick % tick_spacing != 0 || max_tick > protocol_max || max_tick <= min_tick {
            return Err(RangeCoreError::InvalidTick(max_tick));
        }
        Ok(Self {
            tick_spacing,
            min_tick,
            max_tick,
        })
    }

    /// Largest grid tick at or below `tick`
    pub fn align_down(&self, tick: i32) -> i32 {
        tick.div_euclid(self.tick_spacing) * self.tick_spacing
    }

    /// Smallest grid tick at or above `tick`
    pub fn align_up(&self, tick: i32) -> i32 {
        let down = self.align_down(tick);
        if down == tick {
            down
        } else {
            down + self.tick_spacing
        }
    }

    /// Nearest grid tick, ties rounding up
    pub fn align_nearest(&self, tick: i32) -> i32 {
        let remainder = tick.rem_euclid(self.tick_spacing);
        if remainder * 2 >= self.tick_spacing {
            tick - remainder + self.tick_spacing
        } else {
            tick - remainder
        }
    }

    pub fn clamp(&self, tick: i32) -> i32 {
        tick.clamp(self.min_tick, self.max_tick)
    }

    pub fn is_aligned(&self, tick: i32) -> bool {
        tick % self.tick_spacing == 0
    }

    pub fn contains(&self, tick: i32) -> bool {
        tick >= self.min_tick && tick <= self.max_tick
    }
}

/// Validated price anchor taken from a pool snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolPriceContext {
    pub pool_tick: i32,
    /// Decimal-adjusted price of token0 in token1 at `pool_tick`
    pub pool_price: f64,
}

impl PoolPriceContext {
    pub fn new(pool_tick: i32, pool_price: f64) -> CoreResult<Self> {
        if !pool_price.is_finite() || pool_price <= 0.0 {
            return Err(RangeCoreError::InvalidPoolState("non-positive or non-finite price"));
        }
        Ok(Self { pool_tick, pool_price })
    }

    pub fn from_pool_state(state: &PoolState) -> CoreResult<Self> {
        Self::new(state.tick, state.price()?)
    }

    /// Missing pool state stays missing; it is never replaced by a default anchor
    pub fn from_optional(state: Option<&PoolState>) -> CoreResult<Self> {
        match state {
            Some(state) => Self::from_pool_state(state),
            None => Err(RangeCoreError::InvalidPoolState("pool state not loaded")),
        }
    }
}

/// Price at `tick` as a number, quoted in `denomination`
pub fn tick_to_price_value(tick: i32, ctx: &PoolPriceContext, denomination: Denomination) -> f64 {
    let price_delta = TICK_BASE.powf((tick as f64) - (ctx.pool_tick as f64));
    let token1_per_token0 = ctx.pool_price * price_delta;

    match denomination {
        Denomination::Token1 => token1_per_token0,
        Denomination::Token0 => 1.0 / token1_per_token0,
    }
}

/// Price at `tick` formatted for display.
///
/// The grid's outermost ticks are sentinels: the end where the displayed
/// price grows without bound renders as `"∞"`, the other end as `"0"`.
pub fn tick_to_price(
    tick: i32,
    ctx: &PoolPriceContext,
    denomination: Denomination,
    grid: &TickGrid,
    policy: &PricePolicy,
) -> String {
    let at_max = tick >= grid.max_tick;
    let at_min = tick <= grid.min_tick;

    match (denomination, at_min, at_max) {
        (Denomination::Token1, _, true) | (Denomination::Token0, true, _) => {
            return INFINITY_SYMBOL.to_string();
        }
        (Denomination::Token1, true, _) | (Denomination::Token0, _, true) => {
            return "0".to_string();
        }
        _ => {}
    }

    format_price(tick_to_price_value(tick, ctx, denomination), policy)
}

/// Parse a displayed price back into a grid tick for the given bound.
///
/// `"∞"` and `"infinity"` map to the grid end where the displayed price is
/// unbounded. The raw tick is rounded outward (floor for the lower bound,
/// ceil for the upper bound), snapped to the nearest multiple of the tick
/// spacing and clamped to the grid.
pub fn price_to_tick(
    input: &str,
    bound: RangeBound,
    denomination: Denomination,
    grid: &TickGrid,
    ctx: &PoolPriceContext,
) -> CoreResult<i32> {
    let trimmed = input.trim();
    if trimmed == INFINITY_SYMBOL || trimmed.eq_ignore_ascii_case("infinity") {
        return Ok(match denomination {
            Denomination::Token1 => grid.max_tick,
            Denomination::Token0 => grid.min_tick,
        });
    }

    let price: f64 = trimmed
        .parse()
        .map_err(|_| RangeCoreError::invalid_price(input))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(RangeCoreError::invalid_price(input));
    }

    let token1_per_token0 = match denomination {
        Denomination::Token1 => price,
        Denomination::Token0 => 1.0 / price,
    };

    let raw = ctx.pool_tick as f64 + (token1_per_token0 / ctx.pool_price).ln() / TICK_BASE.ln();
    if !raw.is_finite() {
        return Err(RangeCoreError::invalid_price(input));
    }

    let nearest = raw.round();
    let outward = if (raw - nearest).abs() < TICK_SNAP_TOLERANCE {
        nearest
    } else {
        match bound {
            RangeBound::Lower => raw.floor(),
            RangeBound::Upper => raw.ceil(),
        }
    };

    // Keep the cast in range; anything past the grid clamps anyway
    let limit = (MAX_TICK + grid.tick_spacing) as f64;
    let tick = outward.clamp(-limit, limit) as i32;

    Ok(grid.clamp(grid.align_nearest(tick)))
}
