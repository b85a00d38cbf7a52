//! Spaced-repetition scheduling.
//!
//! One pure transition function maps a card's memory state and a review
//! grade to its next schedule:
//!
//! - `again`: ease drops by `again_penalty`, interval resets to 0, due now
//! - `hard`: ease drops by `hard_penalty`, interval grows by `hard_multiplier`
//! - `good`: ease unchanged, interval grows by the ease factor
//! - `easy`: ease rises by `easy_bonus`, interval grows by ease x `easy_multiplier`
//!
//! Every growing grade adds at least one day, ease never falls below
//! [`MIN_EASE`], and for the same starting state the intervals are ordered
//! `hard <= good < easy` below the interval cap. The clock is an argument so
//! transitions replay exactly in tests.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulingConfig;
use crate::core::grade::Grade;

/// Floor for the ease factor.
pub const MIN_EASE: f64 = 1.3;

/// Ceiling for `scheduling.max_interval_days`, one hundred years.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// The inputs the scheduler reads from a card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub ease: f64,
    pub interval: u32,
}

/// The triple the scheduler produces and the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub ease: f64,
    pub interval: u32,
    pub due: DateTime<Utc>,
}

/// Compute the next schedule for a card reviewed at `now`.
pub fn compute_next(
    state: &MemoryState,
    grade: Grade,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Schedule {
    let max_interval = config.max_interval_days.clamp(1, MAX_INTERVAL_DAYS);
    let ease = normalize_ease(state.ease, config);
    let interval = state.interval.min(max_interval);

    let (ease, interval) = match grade {
        Grade::Again => ((ease - config.again_penalty).max(MIN_EASE), 0),
        Grade::Hard => (
            (ease - config.hard_penalty).max(MIN_EASE),
            grow(interval, config.hard_multiplier, max_interval),
        ),
        Grade::Good => (ease, good_interval(interval, ease, config, max_interval)),
        Grade::Easy => {
            let raised = (ease + config.easy_bonus).max(MIN_EASE);
            let floor = good_interval(interval, ease, config, max_interval)
                .saturating_add(1)
                .min(max_interval);
            let grown = grow(interval, raised * config.easy_multiplier, max_interval);
            (raised, grown.max(floor))
        }
    };

    let due = if interval == 0 {
        now
    } else {
        now.checked_add_signed(Duration::days(i64::from(interval)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    };

    Schedule { ease, interval, due }
}

/// Intervals each grade would produce, in `again, hard, good, easy` order.
pub fn preview_intervals(state: &MemoryState, config: &SchedulingConfig) -> [u32; 4] {
    // Intervals do not depend on the clock.
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    Grade::ALL.map(|grade| compute_next(state, grade, config, epoch).interval)
}

/// Render an interval in days as a short label.
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

/// Clamp a stored ease into the valid range; unusable values fall back to
/// the configured entry-level ease.
fn normalize_ease(ease: f64, config: &SchedulingConfig) -> f64 {
    if ease.is_finite() {
        ease.max(MIN_EASE)
    } else {
        config.initial_ease.max(MIN_EASE)
    }
}

/// The `good` interval, which never grows slower than `hard`.
fn good_interval(interval: u32, ease: f64, config: &SchedulingConfig, max_interval: u32) -> u32 {
    grow(interval, ease.max(config.hard_multiplier), max_interval)
}

/// Scale an interval by `factor`, adding at least one day, capped.
fn grow(interval: u32, factor: f64, max_interval: u32) -> u32 {
    let scaled = (f64::from(interval) * factor).round();
    let scaled = if scaled.is_finite() && scaled > 0.0 {
        // Float-to-int casts saturate.
        scaled.min(f64::from(max_interval)) as u32
    } else {
        0
    };
    scaled.max(interval.saturating_add(1)).min(max_interval)
}
