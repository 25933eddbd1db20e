//! # Amount and Price Formatting
//!
//! Conversions between user-entered decimal strings and raw integer token
//! amounts, and the display rules for amounts and prices.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::constants::{
    DEFAULT_MAX_PRICE_DECIMALS, DEFAULT_PRICE_SIGNIFICANT_DIGITS, DEFAULT_USD_PRICE_DECIMALS,
    INFINITY_SYMBOL, STABLE_POOL_USD_PRICE_DECIMALS, TRUNCATION_MARKER,
};
use crate::errors::{CoreResult, RangeCoreError};
use crate::token::TokenMetadata;
use crate::types::PoolKind;

// ============================================================================
// Raw Amount Conversion
// ============================================================================

/// Convert a user decimal string into a raw integer amount.
///
/// Rejects negative values, unparsable input and more fraction digits than
/// the token carries. Zero is returned as `Ok(0)`; callers decide what a zero
/// input means.
pub fn parse_units(amount: &str, decimals: u8) -> CoreResult<u128> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(RangeCoreError::invalid_amount(amount));
    }

    let value = Decimal::from_str(trimmed)
        .map_err(|_| RangeCoreError::invalid_amount(amount))?
        .normalize();

    if value.is_zero() {
        return Ok(0);
    }
    if value.is_sign_negative() {
        return Err(RangeCoreError::invalid_amount(amount));
    }

    let scale = value.scale();
    if scale > decimals as u32 {
        return Err(RangeCoreError::invalid_amount(amount));
    }

    let mantissa = u128::try_from(value.mantissa()).map_err(|_| RangeCoreError::invalid_amount(amount))?;
    let factor = 10u128
        .checked_pow(decimals as u32 - scale)
        .ok_or(RangeCoreError::MathOverflow)?;

    mantissa.checked_mul(factor).ok_or(RangeCoreError::MathOverflow)
}

/// Exact decimal rendering of a raw integer amount, without trailing zeros
pub fn format_units(raw: u128, decimals: u8) -> String {
    let (integer, fraction) = split_units(raw, decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        integer
    } else {
        format!("{}.{}", integer, fraction)
    }
}

/// Integer part and zero-padded fraction part of a raw amount
fn split_units(raw: u128, decimals: u8) -> (String, String) {
    let digits = raw.to_string();
    let decimals = decimals as usize;

    if decimals == 0 {
        return (digits, String::new());
    }

    if digits.len() <= decimals {
        let padded = format!("{}{}", "0".repeat(decimals - digits.len()), digits);
        ("0".to_string(), padded)
    } else {
        let (integer, fraction) = digits.split_at(digits.len() - decimals);
        (integer.to_string(), fraction.to_string())
    }
}

// ============================================================================
// Token Amount Display
// ============================================================================

/// A raw amount together with its display text
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayAmount {
    pub raw: u128,
    pub text: String,
    /// True when digits were dropped from the displayed value
    pub truncated: bool,
}

/// Format a raw amount with the token's display precision.
///
/// Non-zero values below one display unit render as `"< 0.0001"`. Everything
/// else is truncated (never rounded up) and marked with `…` when digits were
/// dropped.
pub fn format_token_amount(raw: u128, token: &TokenMetadata) -> DisplayAmount {
    if raw == 0 {
        return DisplayAmount {
            raw,
            text: "0".to_string(),
            truncated: false,
        };
    }

    let shown = token.display_decimals.min(token.decimals) as usize;
    let (integer, fraction) = split_units(raw, token.decimals);

    let kept = &fraction[..shown.min(fraction.len())];
    let dropped = &fraction[kept.len()..];
    let truncated = dropped.chars().any(|c| c != '0');

    if integer == "0" && kept.chars().all(|c| c == '0') {
        return DisplayAmount {
            raw,
            text: format!("< {}", smallest_unit(shown as u32)),
            truncated: true,
        };
    }

    let kept = kept.trim_end_matches('0');
    let mut text = if kept.is_empty() {
        integer
    } else {
        format!("{}.{}", integer, kept)
    };
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }

    DisplayAmount { raw, text, truncated }
}

/// `"0.001"` for three decimals, `"1"` for zero
fn smallest_unit(decimals: u32) -> String {
    if decimals == 0 {
        "1".to_string()
    } else {
        format!("0.{}1", "0".repeat(decimals as usize - 1))
    }
}

// ============================================================================
// Price Display
// ============================================================================

/// Rules for rendering a price expressed in one quote token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct PricePolicy {
    /// Fraction digits always considered
    pub decimals: u32,

    /// More fraction digits are added until this many significant digits show
    pub significant_digits: u32,

    /// Values below `10^-max_decimals` render as a threshold. Values above it
    /// always get enough fraction digits for `significant_digits`.
    pub max_decimals: u32,

    /// Keep zeros up to `decimals` (currency style) instead of trimming them all
    pub keep_trailing_zeros: bool,
}

impl PricePolicy {
    /// Policy for prices quoted in `quote` on a pool of the given kind
    pub fn for_quote(quote: &TokenMetadata, kind: PoolKind) -> Self {
        if quote.is_usd_pegged() {
            let decimals = match kind {
                PoolKind::Stable => STABLE_POOL_USD_PRICE_DECIMALS,
                PoolKind::Volatile => DEFAULT_USD_PRICE_DECIMALS,
            };
            Self {
                decimals,
                significant_digits: DEFAULT_PRICE_SIGNIFICANT_DIGITS,
                max_decimals: DEFAULT_MAX_PRICE_DECIMALS,
                keep_trailing_zeros: true,
            }
        } else {
            Self {
                decimals: quote.display_decimals as u32,
                significant_digits: DEFAULT_PRICE_SIGNIFICANT_DIGITS,
                max_decimals: DEFAULT_MAX_PRICE_DECIMALS,
                keep_trailing_zeros: false,
            }
        }
    }

    pub fn with_significant_digits(mut self, digits: u32) -> Self {
        self.significant_digits = digits;
        self
    }

    pub fn with_max_decimals(mut self, max_decimals: u32) -> Self {
        self.max_decimals = max_decimals;
        self
    }

    /// Override the currency-style decimals (only meaningful for USD quotes)
    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }
}

impl Default for PricePolicy {
    fn default() -> Self {
        Self {
            decimals: 0,
            significant_digits: DEFAULT_PRICE_SIGNIFICANT_DIGITS,
            max_decimals: DEFAULT_MAX_PRICE_DECIMALS,
            keep_trailing_zeros: false,
        }
    }
}

/// Render a price under `policy`
pub fn format_price(value: f64, policy: &PricePolicy) -> String {
    if value.is_nan() || value <= 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return INFINITY_SYMBOL.to_string();
    }

    let threshold = 10f64.powi(-(policy.max_decimals as i32));
    if value < threshold {
        return format!("<{}", smallest_unit(policy.max_decimals));
    }

    let magnitude = value.log10().floor() as i32;
    let needed = if magnitude >= 0 {
        (policy.significant_digits as i32 - magnitude - 1).max(0)
    } else {
        -magnitude - 1 + policy.significant_digits as i32
    } as u32;

    let decimals = policy.decimals.max(needed) as usize;
    let rendered = format!("{:.*}", decimals, value);

    let floor = if policy.keep_trailing_zeros {
        policy.decimals as usize
    } else {
        0
    };
    trim_fraction(rendered, floor)
}

/// Drop trailing fraction zeros while keeping at least `min_fraction` digits
fn trim_fraction(rendered: String, min_fraction: usize) -> String {
    let Some(dot) = rendered.find('.') else {
        return rendered;
    };

    let mut end = rendered.len();
    let min_end = dot + 1 + min_fraction;
    let bytes = rendered.as_bytes();
    while end > min_end && bytes[end - 1] == b'0' {
        end -= 1;
    }
    if end == dot + 1 {
        end = dot;
    }

    rendered[..end].to_string()
}
