//! Future projection: a random walk over upcoming cycle starts.
//!
//! Each step advances the mean start by the median cycle length and adds
//! the cycle-length variance to a running total; the ±1 σ day bound is the
//! square root of that running variance, so uncertainty compounds in
//! variance rather than linearly in days. Luteal length is treated as
//! fixed relative to the cycle-length variance.

use crate::{CycleStatistics, FutureCycle};
use chrono::{Duration, NaiveDate};

/// Default number of future cycles to project.
pub const DEFAULT_HORIZON: usize = 6;

/// Hard cap on projection steps, for logs with a very stale last entry.
pub const MAX_PROJECTION_STEPS: usize = 60;

/// Days before projected ovulation that open the fertile window.
pub const FERTILE_WINDOW_DAYS: i64 = 5;

/// Project future cycles from the last known cycle start.
///
/// Emits at least `horizon` cycles in chronological order, and keeps
/// stepping past the horizon until one ovulation falls on or after
/// `today`, so a long logging gap still yields a forward-looking
/// forecast (capped at [`MAX_PROJECTION_STEPS`]).
pub fn project(
    last_start: NaiveDate,
    stats: &CycleStatistics,
    horizon: usize,
    today: NaiveDate,
) -> Vec<FutureCycle> {
    let step_days = stats.median_cycle_length.round() as i64;
    let ovulation_offset = (stats.median_cycle_length - stats.median_luteal_length).round() as i64;
    let step_variance = stats.std_dev_cycle_length.powi(2);

    let mut cycles = Vec::with_capacity(horizon);
    let mut mean_start = last_start;
    let mut variance = 0.0_f64;

    for _ in 0..MAX_PROJECTION_STEPS {
        let done = cycles.len() >= horizon
            && cycles
                .last()
                .map_or(false, |c: &FutureCycle| c.ovulation >= today);
        if done {
            break;
        }

        mean_start += Duration::days(step_days);
        variance += step_variance;
        let bound = Duration::days(variance.sqrt().round() as i64);

        let ovulation = mean_start + Duration::days(ovulation_offset);
        cycles.push(FutureCycle {
            start: mean_start,
            start_low: mean_start - bound,
            start_high: mean_start + bound,
            ovulation,
            ovulation_low: ovulation - bound,
            ovulation_high: ovulation + bound,
            fertile_start: ovulation - Duration::days(FERTILE_WINDOW_DAYS),
            fertile_end: ovulation,
        });
    }

    tracing::debug!(
        "Projected {} cycles from {} (median {} days, sd {:.2})",
        cycles.len(),
        last_start,
        step_days,
        stats.std_dev_cycle_length
    );
    cycles
}
