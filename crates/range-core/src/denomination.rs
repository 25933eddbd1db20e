//! Which token a displayed price is quoted in.

use crate::token::TokenMetadata;
use crate::types::RangeBound;

/// Quote token of every displayed min/max/current price.
///
/// `Token1` shows token1 per token0, the pool's own orientation.
/// `Token0` shows the inverted price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum Denomination {
    Token0,
    #[default]
    Token1,
}

/// The displayed price field a user is editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum PriceSide {
    Min,
    Max,
}

impl Denomination {
    /// Pick the quote currency a user expects to read prices in.
    ///
    /// USD-pegged tokens win, then the native currency, then whichever
    /// orientation shows a price of at least one. `price` is token1 per token0.
    pub fn natural(token0: &TokenMetadata, token1: &TokenMetadata, price: Option<f64>) -> Self {
        match (token0.is_usd_pegged(), token1.is_usd_pegged()) {
            (true, false) => return Denomination::Token0,
            (false, true) => return Denomination::Token1,
            _ => {}
        }

        match (token0.is_native_quote(), token1.is_native_quote()) {
            (true, false) => return Denomination::Token0,
            (false, true) => return Denomination::Token1,
            _ => {}
        }

        match price {
            Some(p) if p.is_finite() && p > 0.0 && p < 1.0 => Denomination::Token0,
            _ => Denomination::Token1,
        }
    }

    pub fn is_inverted(self) -> bool {
        self == Denomination::Token0
    }

    pub fn flip(self) -> Self {
        match self {
            Denomination::Token0 => Denomination::Token1,
            Denomination::Token1 => Denomination::Token0,
        }
    }

    /// Token the prices are expressed in
    pub fn quote_token<'a>(self, token0: &'a TokenMetadata, token1: &'a TokenMetadata) -> &'a TokenMetadata {
        match self {
            Denomination::Token0 => token0,
            Denomination::Token1 => token1,
        }
    }

    /// Token being priced
    pub fn base_token<'a>(self, token0: &'a TokenMetadata, token1: &'a TokenMetadata) -> &'a TokenMetadata {
        self.flip().quote_token(token0, token1)
    }

    /// Tick bound changed by an edit of the displayed min or max price.
    ///
    /// Inverting the price reverses its ordering, so the displayed max price of
    /// an inverted view is the lower tick.
    pub fn bound_for(self, side: PriceSide) -> RangeBound {
        match (self, side) {
            (Denomination::Token1, PriceSide::Min) => RangeBound::Lower,
            (Denomination::Token1, PriceSide::Max) => RangeBound::Upper,
            (Denomination::Token0, PriceSide::Min) => RangeBound::Upper,
            (Denomination::Token0, PriceSide::Max) => RangeBound::Lower,
        }
    }
}
