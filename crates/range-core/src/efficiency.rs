//! # Capital Efficiency
//!
//! Concentration multiplier of a tick range relative to full-range liquidity
//! and the fee APR it implies. Pure and synchronous; recompute on every range
//! or base APR change.

use std::fmt;

use crate::constants::{
    DEGENERATE_RATIO_EPSILON, FULL_RANGE_EFFICIENCY, MAX_CAPITAL_EFFICIENCY, TICK_BASE,
};
use crate::preset::{detect_preset, Preset};
use crate::tick_price::TickGrid;
use crate::types::PriceRange;

/// Concentration multiplier, always within `[1, capped_at]`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct CapitalEfficiency {
    pub multiplier: f64,
    pub capped_at: f64,
}

impl CapitalEfficiency {
    fn bounded(multiplier: f64) -> Self {
        let multiplier = if multiplier.is_nan() {
            FULL_RANGE_EFFICIENCY
        } else {
            multiplier.clamp(FULL_RANGE_EFFICIENCY, MAX_CAPITAL_EFFICIENCY)
        };
        Self {
            multiplier,
            capped_at: MAX_CAPITAL_EFFICIENCY,
        }
    }

    pub fn full_range() -> Self {
        Self::bounded(FULL_RANGE_EFFICIENCY)
    }

    /// Closed form for a preset: `1 / (2p)` for a band of `p`
    pub fn for_preset(preset: Preset) -> Self {
        match preset {
            Preset::FullRange => Self::full_range(),
            Preset::Percentage(p) if p > 0.0 => Self::bounded(1.0 / (2.0 * p)),
            Preset::Percentage(_) => Self::bounded(MAX_CAPITAL_EFFICIENCY),
        }
    }

    /// Multiplier for an arbitrary tick pair.
    ///
    /// With `r = (Pu / Pl)^(1/4)` the multiplier is `2 / (r - 1/r)`. Inverted
    /// or empty ranges report 1.
    pub fn for_ticks(tick_lower: i32, tick_upper: i32) -> Self {
        if tick_lower >= tick_upper {
            return Self::full_range();
        }

        // (1.0001^tu / 1.0001^tl)^(1/4) without forming either price
        let width = (tick_upper as f64) - (tick_lower as f64);
        let r = (width * TICK_BASE.ln() / 4.0).exp();

        if (r - 1.0).abs() < DEGENERATE_RATIO_EPSILON {
            return Self::bounded(MAX_CAPITAL_EFFICIENCY);
        }

        Self::bounded(2.0 / (r - 1.0 / r))
    }

    /// Multiplier for a range as the user sees it: full range first, then a
    /// matching preset's closed form, then the tick formula.
    pub fn for_range(range: &PriceRange, pool_tick: i32, grid: &TickGrid) -> Self {
        if range.is_full_range(grid.min_tick, grid.max_tick) {
            return Self::full_range();
        }

        match detect_preset(range, pool_tick, grid) {
            Some(preset) => Self::for_preset(preset),
            None => Self::for_ticks(range.tick_lower, range.tick_upper),
        }
    }
}

/// Fee APR after concentration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct BoostedApr {
    /// Percent, e.g. `12.5` for 12.5%
    pub value: f64,
    pub out_of_range: bool,
}

impl fmt::Display for BoostedApr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.out_of_range {
            write!(f, "{:.2}% (out of range)", 0.0)
        } else {
            write!(f, "{:.2}%", self.value)
        }
    }
}

/// APR boosted by `multiplier`.
///
/// A position whose range excludes the pool tick earns nothing, whatever the
/// multiplier; full-range positions are always in range.
pub fn boosted_apr(
    base_apr: f64,
    multiplier: f64,
    pool_tick: i32,
    range: &PriceRange,
    is_full_range: bool,
) -> BoostedApr {
    if !is_full_range && !range.contains(pool_tick) {
        return BoostedApr {
            value: 0.0,
            out_of_range: true,
        };
    }

    let base = if base_apr.is_finite() && base_apr > 0.0 {
        base_apr
    } else {
        0.0
    };
    let multiplier = if multiplier.is_finite() {
        multiplier.max(FULL_RANGE_EFFICIENCY)
    } else {
        MAX_CAPITAL_EFFICIENCY
    };

    BoostedApr {
        value: (base * multiplier).min(base * MAX_CAPITAL_EFFICIENCY),
        out_of_range: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::preset_to_range;
    use approx::assert_relative_eq;

    #[test]
    fn test_preset_closed_form() {
        let m = CapitalEfficiency::for_preset(Preset::Percentage(0.15));
        assert_relative_eq!(m.multiplier, 1.0 / 0.3, max_relative = 1e-12);
        assert_eq!(m.capped_at, 500.0);

        // 1 / (2 * 0.0005) = 1000 caps at 500
        assert_eq!(CapitalEfficiency::for_preset(Preset::Percentage(0.0005)).multiplier, 500.0);
        assert_eq!(CapitalEfficiency::for_preset(Preset::FullRange).multiplier, 1.0);
    }

    #[test]
    fn test_full_range_is_exactly_one() {
        let grid = TickGrid::new(60).unwrap();
        let range = PriceRange::full(grid.min_tick, grid.max_tick);
        assert_eq!(CapitalEfficiency::for_range(&range, 0, &grid).multiplier, 1.0);
        assert_eq!(CapitalEfficiency::for_ticks(grid.min_tick, grid.max_tick).multiplier, 1.0);
    }

    #[test]
    fn test_degenerate_and_inverted_ranges() {
        assert_eq!(CapitalEfficiency::for_ticks(100, 100).multiplier, 1.0);
        assert_eq!(CapitalEfficiency::for_ticks(100, -100).multiplier, 1.0);
        // One tick wide saturates the cap
        assert_eq!(CapitalEfficiency::for_ticks(0, 1).multiplier, 500.0);
    }

    #[test]
    fn test_manual_range_formula() {
        let m = CapitalEfficiency::for_ticks(-1000, 1000).multiplier;
        let r = (2000.0 * 1.0001f64.ln() / 4.0).exp();
        assert_relative_eq!(m, 2.0 / (r - 1.0 / r), max_relative = 1e-12);
        assert!(m > 1.0 && m < 500.0);
    }

    #[test]
    fn test_for_range_uses_preset_when_detected() {
        let grid = TickGrid::new(60).unwrap();
        let range = preset_to_range(Preset::Percentage(0.15), 0, &grid).unwrap();
        let m = CapitalEfficiency::for_range(&range, 0, &grid);
        assert_relative_eq!(m.multiplier, 3.3333333333, max_relative = 1e-9);
    }

    #[test]
    fn test_out_of_range_apr_is_zero() {
        let range = PriceRange::new(100, 200).unwrap();
        let apr = boosted_apr(10.0, 50.0, 300, &range, false);
        assert_eq!(apr.value, 0.0);
        assert!(apr.out_of_range);
        assert_eq!(apr.to_string(), "0.00% (out of range)");
    }

    #[test]
    fn test_full_range_ignores_pool_tick() {
        let range = PriceRange::new(100, 200).unwrap();
        let apr = boosted_apr(10.0, 1.0, 300, &range, true);
        assert!(!apr.out_of_range);
        assert_eq!(apr.value, 10.0);
    }

    #[test]
    fn test_boost_is_capped() {
        let range = PriceRange::new(-10, 10).unwrap();
        let apr = boosted_apr(2.0, 10_000.0, 0, &range, false);
        assert_eq!(apr.value, 1000.0);
        assert_eq!(boosted_apr(4.0, 3.0, 0, &range, false).to_string(), "12.00%");
    }
}
