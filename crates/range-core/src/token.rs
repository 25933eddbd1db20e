//! Token metadata supplied by configuration.

use crate::constants::{NATIVE_QUOTE_SYMBOLS, USD_PEGGED_SYMBOLS};

/// Static description of a pool token
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenMetadata {
    /// Ticker shown to the user
    pub symbol: String,

    /// On-chain decimals used for raw amounts
    pub decimals: u8,

    /// Fraction digits shown for amounts of this token
    pub display_decimals: u8,

    /// Contract address (zero address for the native currency)
    pub address: String,
}

impl TokenMetadata {
    pub fn new(symbol: &str, decimals: u8, display_decimals: u8, address: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            display_decimals,
            address: address.to_string(),
        }
    }

    /// Whether the token tracks the US dollar
    pub fn is_usd_pegged(&self) -> bool {
        symbol_in(&self.symbol, USD_PEGGED_SYMBOLS)
    }

    /// Whether the token is the chain's native currency or its wrapped form
    pub fn is_native_quote(&self) -> bool {
        symbol_in(&self.symbol, NATIVE_QUOTE_SYMBOLS)
    }
}

fn symbol_in(symbol: &str, list: &[&str]) -> bool {
    list.iter().any(|s| s.eq_ignore_ascii_case(symbol))
}
