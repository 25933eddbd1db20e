//! # Protocol Constants
//!
//! Tick grid bounds, capital efficiency limits and display defaults shared by
//! every range and amount calculation.

// ============================================================================
// Tick Grid Constants
// ============================================================================

/// Minimum tick supported by the pool manager
pub const MIN_TICK: i32 = -887_272;

/// Maximum tick supported by the pool manager
pub const MAX_TICK: i32 = 887_272;

/// Price ratio between two adjacent ticks
pub const TICK_BASE: f64 = 1.0001;

/// Minimum tick spacing
pub const MIN_TICK_SPACING: i32 = 1;

/// Maximum tick spacing
pub const MAX_TICK_SPACING: i32 = 32_767;

/// A raw tick closer than this to an integer is treated as that integer
/// before outward rounding.
pub const TICK_SNAP_TOLERANCE: f64 = 0.1;

// ============================================================================
// Capital Efficiency Constants
// ============================================================================

/// Upper bound on the concentration multiplier
pub const MAX_CAPITAL_EFFICIENCY: f64 = 500.0;

/// Multiplier of a full range position
pub const FULL_RANGE_EFFICIENCY: f64 = 1.0;

/// `r` values closer than this to 1 are treated as a zero-width range
pub const DEGENERATE_RATIO_EPSILON: f64 = 1e-9;

// ============================================================================
// Display Constants
// ============================================================================

/// Rendered for an unbounded upper price
pub const INFINITY_SYMBOL: &str = "∞";

/// Marker appended to a truncated amount
pub const TRUNCATION_MARKER: &str = "…";

/// Minimum significant digits kept when rendering a price
pub const DEFAULT_PRICE_SIGNIFICANT_DIGITS: u32 = 6;

/// Fraction digits for a USD-pegged quote on a volatile pool
pub const DEFAULT_USD_PRICE_DECIMALS: u32 = 2;

/// Fraction digits for a USD-pegged quote on a stable pool
pub const STABLE_POOL_USD_PRICE_DECIMALS: u32 = 4;

/// Prices below `10^-DEFAULT_MAX_PRICE_DECIMALS` render as a threshold
pub const DEFAULT_MAX_PRICE_DECIMALS: u32 = 18;

/// Largest token decimals accepted from metadata
pub const MAX_TOKEN_DECIMALS: u8 = 36;

/// Symbols treated as USD-pegged quote currencies
pub const USD_PEGGED_SYMBOLS: &[&str] = &[
    "USDC", "USDT", "DAI", "USDS", "USDE", "FRAX", "LUSD", "PYUSD", "GHO", "TUSD", "USDC.E", "USDBC",
];

/// Symbols preferred as quote when neither token is USD-pegged
pub const NATIVE_QUOTE_SYMBOLS: &[&str] = &["WETH", "ETH"];
