//! Biomarker analysis: retrospective ovulation detection for one cycle.
//!
//! Implements the symptothermal temperature-shift ("coverline") rule with
//! an ovulation-test fallback:
//! - Baseline = max of the 6 valid readings preceding a candidate
//! - Shift confirmed when 3 consecutive readings hold at or above the
//!   baseline and the third clears it by 0.2 °C
//! - Without a shift, the first LH surge infers a presumed ovulation

use crate::{BiomarkerResult, DailyEntry, OvulationConfidence};
use chrono::Duration;

/// Number of preceding valid readings that form the coverline baseline.
pub const BASELINE_WINDOW: usize = 6;

/// Number of consecutive readings that must hold above the baseline.
pub const SHIFT_CONFIRM_READINGS: usize = 3;

/// Margin the final confirmation reading must clear, in °C.
pub const SHIFT_THRESHOLD: f64 = 0.2;

/// Minimum number of valid readings before shift detection can fire.
pub const MIN_READINGS: usize = BASELINE_WINDOW + SHIFT_CONFIRM_READINGS;

/// Shortest realized cycle length accepted into statistics, in days.
pub const MIN_PLAUSIBLE_CYCLE_DAYS: i64 = 20;

/// Longest realized cycle length accepted into statistics, in days.
pub const MAX_PLAUSIBLE_CYCLE_DAYS: i64 = 45;

/// Whether a realized cycle length is plausible enough for statistics.
///
/// Implausible lengths (typo or missed logging) stay visible in history
/// but never feed the forecast.
pub fn plausible_cycle_length(days: i64) -> bool {
    (MIN_PLAUSIBLE_CYCLE_DAYS..=MAX_PLAUSIBLE_CYCLE_DAYS).contains(&days)
}

/// Analyze one cycle's entries (ascending by date) for an ovulation signal.
///
/// The temperature-shift scan stops at the first qualifying window: the
/// earliest detectable shift wins. The confirmed ovulation date is the day
/// *before* the first elevated reading, since the shift becomes visible
/// one day after the true ovulation day. An LH surge only ever fills in
/// when no shift is found, and then with `Inferred` confidence.
pub fn analyze(entries: &[&DailyEntry]) -> BiomarkerResult {
    if let Some(result) = detect_temperature_shift(entries) {
        return result;
    }

    // Fallback: presumed ovulation the day after the first LH surge
    if let Some(surge) = entries
        .iter()
        .find(|e| e.lh_test.map_or(false, |t| t.is_surge()))
    {
        tracing::debug!("No temperature shift; inferring ovulation from LH surge on {}", surge.date);
        return BiomarkerResult {
            ovulation: Some(surge.date + Duration::days(1)),
            coverline: None,
            confidence: OvulationConfidence::Inferred,
        };
    }

    BiomarkerResult::default()
}

fn detect_temperature_shift(entries: &[&DailyEntry]) -> Option<BiomarkerResult> {
    let readings: Vec<_> = entries
        .iter()
        .filter_map(|e| e.usable_temperature().map(|t| (e.date, t)))
        .collect();

    if readings.len() < MIN_READINGS {
        return None;
    }

    // The scan is bounded by the reading count, so a pathological interval
    // cannot blow this up past O(n * BASELINE_WINDOW).
    for i in BASELINE_WINDOW..=readings.len() - SHIFT_CONFIRM_READINGS {
        let baseline = readings[i - BASELINE_WINDOW..i]
            .iter()
            .map(|&(_, t)| t)
            .fold(f64::NEG_INFINITY, f64::max);

        let window = &readings[i..i + SHIFT_CONFIRM_READINGS];
        let sustained = window.iter().all(|&(_, t)| t >= baseline);
        let cleared = window[SHIFT_CONFIRM_READINGS - 1].1 >= baseline + SHIFT_THRESHOLD;

        if sustained && cleared {
            let ovulation = readings[i].0 - Duration::days(1);
            tracing::debug!(
                "Temperature shift confirmed: ovulation {}, coverline {:.2}",
                ovulation,
                baseline
            );
            return Some(BiomarkerResult {
                ovulation: Some(ovulation),
                coverline: Some(baseline),
                confidence: OvulationConfidence::Confirmed,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LhTestResult;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn temp_entry(s: &str, temp: f64) -> DailyEntry {
        let mut entry = DailyEntry::new(date(s));
        entry.temperature = Some(temp);
        entry
    }

    fn daily_temps(start: &str, temps: &[f64]) -> Vec<DailyEntry> {
        let start = date(start);
        temps
            .iter()
            .enumerate()
            .map(|(i, &t)| temp_entry(&(start + Duration::days(i as i64)).to_string(), t))
            .collect()
    }

    /// 6 low readings then 3 high ones crossing baseline + 0.2 on the third
    fn shift_pattern(start: &str) -> Vec<DailyEntry> {
        daily_temps(start, &[36.4, 36.3, 36.45, 36.5, 36.35, 36.4, 36.6, 36.65, 36.75])
    }

    #[test]
    fn test_clean_shift_confirms_ovulation() {
        let entries = shift_pattern("2024-01-10");
        let refs: Vec<_> = entries.iter().collect();
        let result = analyze(&refs);

        // First high reading is 2024-01-16; ovulation is the day before
        assert_eq!(result.ovulation, Some(date("2024-01-15")));
        assert_eq!(result.coverline, Some(36.5));
        assert_eq!(result.confidence, OvulationConfidence::Confirmed);
    }

    #[test]
    fn test_third_reading_below_threshold_rejected() {
        // All three hold above baseline but the third misses +0.2
        let entries = daily_temps(
            "2024-01-10",
            &[36.4, 36.3, 36.45, 36.5, 36.35, 36.4, 36.55, 36.6, 36.65],
        );
        let refs: Vec<_> = entries.iter().collect();
        let result = analyze(&refs);
        assert_eq!(result.confidence, OvulationConfidence::NotDetected);
    }

    #[test]
    fn test_dip_inside_window_rejected() {
        // Third reading clears the threshold but the second dips below
        // the baseline, so the rise is not sustained
        let entries = daily_temps(
            "2024-01-10",
            &[36.4, 36.3, 36.45, 36.5, 36.35, 36.4, 36.6, 36.45, 36.75],
        );
        let refs: Vec<_> = entries.iter().collect();
        let result = analyze(&refs);
        assert_eq!(result.confidence, OvulationConfidence::NotDetected);
    }

    #[test]
    fn test_too_few_readings_yields_nothing() {
        let entries = daily_temps("2024-01-10", &[36.4, 36.3, 36.45, 36.5, 36.35, 36.6, 36.7, 36.8]);
        let refs: Vec<_> = entries.iter().collect();
        let result = analyze(&refs);
        assert_eq!(result.ovulation, None);
        assert_eq!(result.confidence, OvulationConfidence::NotDetected);
    }

    #[test]
    fn test_excluded_temperatures_are_skipped() {
        let mut entries = shift_pattern("2024-01-10");
        // A fever spike excluded by the user must not fake a baseline
        entries[6].exclude_temp = true;
        let refs: Vec<_> = entries.iter().collect();
        let result = analyze(&refs);
        // With the first high reading excluded only 8 valid readings remain
        assert_eq!(result.confidence, OvulationConfidence::NotDetected);
    }

    #[test]
    fn test_lh_surge_fallback_is_inferred() {
        let mut surge = DailyEntry::new(date("2024-01-14"));
        surge.lh_test = Some(LhTestResult::Peak);
        let entries = vec![surge];
        let refs: Vec<_> = entries.iter().collect();
        let result = analyze(&refs);

        assert_eq!(result.ovulation, Some(date("2024-01-15")));
        assert_eq!(result.coverline, None);
        assert_eq!(result.confidence, OvulationConfidence::Inferred);
    }

    #[test]
    fn test_confirmed_shift_beats_lh_surge() {
        let mut entries = shift_pattern("2024-01-10");
        entries[2].lh_test = Some(LhTestResult::Positive);
        let refs: Vec<_> = entries.iter().collect();
        let result = analyze(&refs);
        assert_eq!(result.confidence, OvulationConfidence::Confirmed);
        assert_eq!(result.ovulation, Some(date("2024-01-15")));
    }

    #[test]
    fn test_no_signal_yields_empty_result() {
        let entries = vec![DailyEntry::new(date("2024-01-01"))];
        let refs: Vec<_> = entries.iter().collect();
        let result = analyze(&refs);
        assert_eq!(result, BiomarkerResult::default());
    }

    #[test]
    fn test_plausible_cycle_length_bounds() {
        assert!(!plausible_cycle_length(19));
        assert!(plausible_cycle_length(20));
        assert!(plausible_cycle_length(45));
        assert!(!plausible_cycle_length(46));
    }
}
