//! History statistics: robust aggregation of realized cycle lengths.
//!
//! Median and mean over the plausibility-filtered cycle lengths, sample
//! standard deviation, and the same treatment for luteal-phase lengths
//! from cycles with a confirmed ovulation. Too little history degrades to
//! named defaults instead of failing, so downstream consumers always have
//! something to forecast from.

use crate::{CycleStatistics, EngineSettings};

/// Assumed cycle length before enough history exists, in days.
pub const DEFAULT_CYCLE_LENGTH: i64 = 28;

/// Assumed luteal-phase length before confirmed ovulations exist, in days.
pub const DEFAULT_LUTEAL_LENGTH: i64 = 14;

/// Cycle-length spread assumed before enough history exists, in days.
pub const DEFAULT_CYCLE_SPREAD: f64 = 1.5;

/// Spread assumed for a sample of fewer than two points, in days.
pub const SINGLE_SAMPLE_SPREAD: f64 = 1.0;

/// Minimum realized cycles before computed statistics replace defaults.
pub const MIN_CYCLES_FOR_STATS: usize = 2;

/// Aggregate realized cycle lengths and confirmed luteal lengths into
/// `CycleStatistics`.
///
/// `cycle_lengths` must already be plausibility-filtered (§biomarker);
/// `luteal_lengths` covers only cycles whose ovulation was confirmed.
/// With fewer than [`MIN_CYCLES_FOR_STATS`] cycle lengths the settings'
/// fallback lengths and [`DEFAULT_CYCLE_SPREAD`] are returned unchanged.
pub fn compute(
    cycle_lengths: &[i64],
    luteal_lengths: &[i64],
    settings: &EngineSettings,
) -> CycleStatistics {
    if cycle_lengths.len() < MIN_CYCLES_FOR_STATS {
        tracing::debug!(
            "Only {} realized cycles; falling back to default statistics",
            cycle_lengths.len()
        );
        return fallback(settings, cycle_lengths.len());
    }

    let (median_cycle, mean_cycle) = median_and_mean(cycle_lengths);
    let std_dev = sample_std_dev(cycle_lengths, mean_cycle);

    let (median_luteal, mean_luteal) = if luteal_lengths.is_empty() {
        let luteal = settings.luteal_phase as f64;
        (luteal, luteal)
    } else {
        median_and_mean(luteal_lengths)
    };

    CycleStatistics {
        mean_cycle_length: mean_cycle,
        median_cycle_length: median_cycle,
        std_dev_cycle_length: std_dev,
        mean_luteal_length: mean_luteal,
        median_luteal_length: median_luteal,
        cycle_count: cycle_lengths.len(),
    }
}

/// Fixed-default statistics used below the history threshold
pub fn fallback(settings: &EngineSettings, cycle_count: usize) -> CycleStatistics {
    CycleStatistics {
        mean_cycle_length: settings.cycle_length as f64,
        median_cycle_length: settings.cycle_length as f64,
        std_dev_cycle_length: DEFAULT_CYCLE_SPREAD,
        mean_luteal_length: settings.luteal_phase as f64,
        median_luteal_length: settings.luteal_phase as f64,
        cycle_count,
    }
}

/// Median (middle element, or average of the two middles) and mean
fn median_and_mean(values: &[i64]) -> (f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    };
    let mean = sorted.iter().sum::<i64>() as f64 / n as f64;
    (median, mean)
}

/// Sample (n-1) standard deviation, degrading to
/// [`SINGLE_SAMPLE_SPREAD`] below two points to avoid division by zero
/// and false precision.
fn sample_std_dev(values: &[i64], mean: f64) -> f64 {
    if values.len() < 2 {
        return SINGLE_SAMPLE_SPREAD;
    }
    let sum_sq: f64 = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}
