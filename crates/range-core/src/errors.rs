//! # Core Error Types
//!
//! Errors produced by the pure range and price functions. Callers above this
//! crate translate them into their own taxonomy.

use thiserror::Error;

use crate::types::TokenSide;

/// Errors raised by tick, price, range and amount calculations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeCoreError {
    // ========================================================================
    // Input Errors
    // ========================================================================
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid tick: {0}")]
    InvalidTick(i32),

    #[error("Invalid tick spacing: {0}")]
    InvalidTickSpacing(i32),

    #[error("Invalid price range: lower {lower} must be below upper {upper}")]
    InvalidRange { lower: i32, upper: i32 },

    #[error("Invalid pool state: {0}")]
    InvalidPoolState(&'static str),

    #[error("Invalid preset: {0}")]
    InvalidPreset(String),

    // ========================================================================
    // Range Errors
    // ========================================================================
    #[error("Range too narrow: width {width} is below tick spacing {tick_spacing}")]
    RangeTooNarrow { width: i32, tick_spacing: i32 },

    #[error("Range is out of the current price and only accepts {0:?}")]
    SingleSided(TokenSide),

    // ========================================================================
    // Math Errors
    // ========================================================================
    #[error("Math overflow")]
    MathOverflow,

    #[error("Non-finite intermediate value")]
    NonFinite,
}

/// Result type using core errors
pub type CoreResult<T> = Result<T, RangeCoreError>;

impl RangeCoreError {
    /// Create an invalid price error from the offending input
    pub fn invalid_price(input: &str) -> Self {
        Self::InvalidPrice(input.to_string())
    }

    /// Create an invalid amount error from the offending input
    pub fn invalid_amount(input: &str) -> Self {
        Self::InvalidAmount(input.to_string())
    }

    /// True for errors caused by what the user typed rather than pool state
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPrice(_) | Self::InvalidAmount(_) | Self::InvalidRange { .. }
        )
    }
}
