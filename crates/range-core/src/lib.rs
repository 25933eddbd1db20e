//! # Range Core - Position Range Logic
//!
//! Pure, synchronous building blocks shared by every position form:
//!
//! - Tick to price conversion in either token denomination
//! - Percentage and full range presets, with reverse detection
//! - Capital efficiency multiplier and boosted APR
//! - Token amount parsing and display rules
//! - Floating-point liquidity estimates
//!
//! Nothing here performs I/O. Pool state and token metadata are inputs.
//!
//! ## Feature Flags
//!
//! - `client`: Enables serde on public types for off-chain consumers

pub mod constants;
pub mod denomination;
pub mod efficiency;
pub mod errors;
pub mod format;
pub mod liquidity;
pub mod preset;
pub mod tick_price;
pub mod token;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use denomination::{Denomination, PriceSide};
pub use efficiency::{boosted_apr, BoostedApr, CapitalEfficiency};
pub use errors::{CoreResult, RangeCoreError};
pub use format::{format_price, format_token_amount, format_units, parse_units, DisplayAmount, PricePolicy};
pub use preset::{detect_preset, preset_to_range, Preset};
pub use tick_price::{price_to_tick, tick_to_price, tick_to_price_value, usable_tick_bounds, PoolPriceContext, TickGrid};
pub use token::TokenMetadata;
pub use types::{PoolKind, PoolState, PriceRange, RangeBound, TokenSide};
