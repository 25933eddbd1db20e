//! # Shared Types
//!
//! Pool snapshots and tick ranges passed between the calculators.

use crate::errors::{CoreResult, RangeCoreError};

/// Snapshot of a pool as reported by the chain-state provider.
///
/// Treated as immutable; a refresh produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolState {
    /// Current pool tick
    pub tick: i32,

    /// Q64.96 sqrt price as a decimal string
    pub sqrt_price_x96: String,

    /// Active liquidity as a decimal string
    pub liquidity: String,

    /// Decimal-adjusted price of token0 in token1
    pub price_token1_per_token0: String,
}

impl PoolState {
    /// Parse the decimal price, rejecting non-finite and non-positive values
    pub fn price(&self) -> CoreResult<f64> {
        let price: f64 = self
            .price_token1_per_token0
            .trim()
            .parse()
            .map_err(|_| RangeCoreError::InvalidPoolState("unparsable price"))?;

        if !price.is_finite() || price <= 0.0 {
            return Err(RangeCoreError::InvalidPoolState("non-positive or non-finite price"));
        }

        Ok(price)
    }
}

/// Ordered tick pair with `tick_lower < tick_upper`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceRange {
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl PriceRange {
    /// Create a range, rejecting empty and inverted pairs
    pub fn new(tick_lower: i32, tick_upper: i32) -> CoreResult<Self> {
        if tick_lower >= tick_upper {
            return Err(RangeCoreError::InvalidRange {
                lower: tick_lower,
                upper: tick_upper,
            });
        }
        Ok(Self { tick_lower, tick_upper })
    }

    /// Range covering every usable tick
    pub fn full(min_tick: i32, max_tick: i32) -> Self {
        Self {
            tick_lower: min_tick,
            tick_upper: max_tick,
        }
    }

    pub fn width(&self) -> i32 {
        self.tick_upper - self.tick_lower
    }

    /// Inclusive on both ends
    pub fn contains(&self, tick: i32) -> bool {
        tick >= self.tick_lower && tick <= self.tick_upper
    }

    pub fn is_full_range(&self, min_tick: i32, max_tick: i32) -> bool {
        self.tick_lower <= min_tick && self.tick_upper >= max_tick
    }

    /// Copy with one bound replaced, validated
    pub fn with_bound(&self, bound: RangeBound, tick: i32) -> CoreResult<Self> {
        match bound {
            RangeBound::Lower => Self::new(tick, self.tick_upper),
            RangeBound::Upper => Self::new(self.tick_lower, tick),
        }
    }
}

/// Which end of a tick range an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum RangeBound {
    Lower,
    Upper,
}

/// One of the two pool tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenSide {
    Token0,
    Token1,
}

impl TokenSide {
    pub fn other(self) -> Self {
        match self {
            TokenSide::Token0 => TokenSide::Token1,
            TokenSide::Token1 => TokenSide::Token0,
        }
    }
}

/// Pool volatility class, used for preset suggestions and price precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolKind {
    Stable,
    #[default]
    Volatile,
}
