//! # Range Presets
//!
//! Named percentage bands around the pool price and the full range, plus the
//! reverse lookup from an arbitrary tick pair to the preset that produced it.
//! Preset bounds move with the pool tick, so detection always recomputes them.

use crate::constants::TICK_BASE;
use crate::errors::{CoreResult, RangeCoreError};
use crate::tick_price::TickGrid;
use crate::types::{PoolKind, PriceRange};

/// A range preset
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum Preset {
    /// Symmetric band of `p` (a fraction, 0.01 = 1%) on each side of the pool price
    Percentage(f64),
    FullRange,
}

impl Preset {
    /// Every recognized preset, percentage bands narrowest first
    pub const ALL: [Preset; 7] = [
        Preset::Percentage(0.001),
        Preset::Percentage(0.005),
        Preset::Percentage(0.01),
        Preset::Percentage(0.03),
        Preset::Percentage(0.08),
        Preset::Percentage(0.15),
        Preset::FullRange,
    ];

    pub fn label(&self) -> String {
        match self {
            Preset::FullRange => "Full Range".to_string(),
            Preset::Percentage(p) => {
                let percent = format!("{:.2}", p * 100.0);
                let percent = percent.trim_end_matches('0').trim_end_matches('.');
                format!("±{}%", percent)
            }
        }
    }

    pub fn percentage(&self) -> Option<f64> {
        match self {
            Preset::Percentage(p) => Some(*p),
            Preset::FullRange => None,
        }
    }

    pub fn is_full_range(&self) -> bool {
        matches!(self, Preset::FullRange)
    }
}

impl PoolKind {
    /// Presets offered for a pool of this kind
    pub fn suggested_presets(&self) -> &'static [Preset] {
        const STABLE: [Preset; 4] = [
            Preset::Percentage(0.001),
            Preset::Percentage(0.005),
            Preset::Percentage(0.01),
            Preset::FullRange,
        ];
        const VOLATILE: [Preset; 5] = [
            Preset::Percentage(0.01),
            Preset::Percentage(0.03),
            Preset::Percentage(0.08),
            Preset::Percentage(0.15),
            Preset::FullRange,
        ];

        match self {
            PoolKind::Stable => &STABLE,
            PoolKind::Volatile => &VOLATILE,
        }
    }
}

/// Ticks spanned by a `p` price move: `round(ln(1 + p) / ln(1.0001))`
pub fn tick_delta(p: f64) -> CoreResult<i32> {
    if !p.is_finite() || p <= 0.0 {
        return Err(RangeCoreError::InvalidPreset(format!("{}", p)));
    }
    let delta = ((1.0 + p).ln() / TICK_BASE.ln()).round();
    if delta > i32::MAX as f64 {
        return Err(RangeCoreError::MathOverflow);
    }
    Ok(delta as i32)
}

/// Tick range for `preset` around `pool_tick`.
///
/// Percentage bands floor the lower bound and ceil the upper bound onto the
/// grid, then clamp to it. A band that collapses below one tick spacing is
/// rejected and the caller keeps its current range.
pub fn preset_to_range(preset: Preset, pool_tick: i32, grid: &TickGrid) -> CoreResult<PriceRange> {
    let (lower, upper) = match preset {
        Preset::FullRange => (grid.min_tick, grid.max_tick),
        Preset::Percentage(p) => {
            let delta = tick_delta(p)?;
            let lower = grid.align_down(pool_tick.saturating_sub(delta));
            let upper = grid.align_up(pool_tick.saturating_add(delta));
            (grid.clamp(lower), grid.clamp(upper))
        }
    };

    let width = upper - lower;
    if width < grid.tick_spacing {
        return Err(RangeCoreError::RangeTooNarrow {
            width,
            tick_spacing: grid.tick_spacing,
        });
    }

    PriceRange::new(lower, upper)
}

/// The preset whose bounds exactly match `range` at the current pool tick.
///
/// Percentage bands are checked narrowest first, then the full range, so a
/// band that clamps onto the grid edges still reports as that band. `None`
/// means a custom range.
pub fn detect_preset(range: &PriceRange, pool_tick: i32, grid: &TickGrid) -> Option<Preset> {
    let percentage = Preset::ALL
        .iter()
        .filter(|preset| !preset.is_full_range())
        .find(|preset| preset_to_range(**preset, pool_tick, grid).as_ref() == Ok(range));

    if let Some(preset) = percentage {
        return Some(*preset);
    }

    if range.is_full_range(grid.min_tick, grid.max_tick) {
        return Some(Preset::FullRange);
    }

    None
}
