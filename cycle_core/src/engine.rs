//! Engine facade: one call from entry log to forecast.
//!
//! Orchestrates segmentation, per-cycle biomarker analysis, history
//! statistics, the current-cycle state machine, and the future projector
//! into a single `EngineResult`. The call is a pure function of
//! (entries, settings, today): no clock reads, no I/O, no state carried
//! between invocations.

use crate::{
    biomarker, projector, segmenter, state_machine, stats, CyclePhaseState, CycleRecord,
    CycleState, CycleStatistics, DailyEntry, DayPrediction, EngineResult, EngineSettings,
    FutureCycle, OvulationConfidence,
};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// Evaluate the full entry log against `today`.
///
/// Always returns a fully populated result: with too little data every
/// component degrades to its documented default, so consumers render
/// "not enough data yet" from the returned values rather than from an
/// error path.
pub fn evaluate(
    entries: &BTreeMap<NaiveDate, DailyEntry>,
    settings: &EngineSettings,
    today: NaiveDate,
) -> EngineResult {
    let intervals = segmenter::segment(entries);

    // Per-cycle biomarker results and realized lengths
    let mut cycles = Vec::with_capacity(intervals.len());
    let mut cycle_lengths = Vec::new();
    let mut luteal_lengths = Vec::new();

    for (idx, interval) in intervals.iter().enumerate() {
        let cycle_entries = segmenter::entries_in(entries, interval);
        let bio = biomarker::analyze(&cycle_entries);

        let realized_length = intervals.get(idx + 1).map(|next| {
            let length = (next.start_date - interval.start_date).num_days();
            if biomarker::plausible_cycle_length(length) {
                cycle_lengths.push(length);
                if bio.confidence == OvulationConfidence::Confirmed {
                    if let Some(ovulation) = bio.ovulation {
                        // Luteal = cycle length minus the 1-based
                        // ovulation day number
                        luteal_lengths.push((next.start_date - ovulation).num_days() - 1);
                    }
                }
            } else {
                tracing::debug!(
                    "Cycle starting {} has implausible length {} days; excluded from statistics",
                    interval.start_date,
                    length
                );
            }
            length
        });

        cycles.push(CycleRecord {
            interval: *interval,
            realized_length,
            biomarker: bio,
        });
    }

    let statistics = stats::compute(&cycle_lengths, &luteal_lengths, settings);

    // Classify the open cycle and project forward from its start
    let current_cycle = cycles.last().map(|record| {
        let cycle_entries = segmenter::entries_in(entries, &record.interval);
        state_machine::classify(
            record.interval.start_date,
            &cycle_entries,
            &record.biomarker,
            &statistics,
            settings,
            today,
        )
    });

    let future_cycles = match &current_cycle {
        Some(phase) => projector::project(
            phase.start_date,
            &statistics,
            settings.forecast_horizon,
            today,
        ),
        None => Vec::new(),
    };

    let today_prediction = day_prediction(
        entries,
        &current_cycle,
        &statistics,
        &future_cycles,
        today,
    );

    EngineResult {
        statistics,
        cycles,
        current_cycle,
        today: today_prediction,
        future_cycles,
    }
}

/// Derive today's single-day classification from the state machine's
/// verdict and the projector's forecast.
fn day_prediction(
    entries: &BTreeMap<NaiveDate, DailyEntry>,
    current: &Option<CyclePhaseState>,
    statistics: &CycleStatistics,
    future_cycles: &[FutureCycle],
    today: NaiveDate,
) -> DayPrediction {
    let Some(phase) = current else {
        return DayPrediction::empty(today);
    };

    let flow_today = entries
        .get(&today)
        .and_then(|e| e.flow)
        .map_or(false, |f| f.is_true_flow());

    let ovulation_day = statistics.estimated_ovulation_day();
    let (fertility_level, fertile) = match phase.state {
        CycleState::Menstruation => (0, false),
        CycleState::PreFertile => (1, false),
        CycleState::FertileMid => {
            // Peak intensity on the last two window days
            if phase.elapsed_days >= ovulation_day - 1 {
                (3, true)
            } else {
                (2, true)
            }
        }
        CycleState::PeakLh => (3, true),
        CycleState::PostOvuPending => (1, false),
        CycleState::OvuConfirmed => (0, false),
        CycleState::AnovulatorySuspected => (1, false),
    };

    let is_ovulation_day = phase.ovulation == Some(today)
        || (phase.state == CycleState::FertileMid && phase.elapsed_days == ovulation_day);

    // Next period = first projected start on or after today
    let next_period_start = future_cycles
        .iter()
        .map(|c| c.start)
        .find(|&start| start >= today);

    // Next ovulation: the current cycle's estimate while it is still
    // ahead (and not already confirmed past), otherwise the forecast's
    let current_estimate = phase
        .ovulation
        .unwrap_or(phase.start_date + Duration::days(ovulation_day));
    let next_ovulation = if current_estimate >= today {
        Some(current_estimate)
    } else {
        future_cycles
            .iter()
            .map(|c| c.ovulation)
            .find(|&d| d >= today)
    };

    DayPrediction {
        date: today,
        state: Some(phase.state),
        fertile,
        fertility_level,
        is_period_day: phase.state == CycleState::Menstruation || flow_today,
        is_ovulation_day,
        next_period_start,
        days_until_period: next_period_start.map(|d| (d - today).num_days()),
        next_ovulation,
        days_until_ovulation: next_ovulation.map(|d| (d - today).num_days()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlowLevel, LhTestResult};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn flow_entry(s: &str, flow: FlowLevel) -> DailyEntry {
        let mut entry = DailyEntry::new(date(s));
        entry.flow = Some(flow);
        entry
    }

    fn temp_entry(s: &str, temp: f64) -> DailyEntry {
        let mut entry = DailyEntry::new(date(s));
        entry.temperature = Some(temp);
        entry
    }

    fn log(entries: Vec<DailyEntry>) -> BTreeMap<NaiveDate, DailyEntry> {
        entries.into_iter().map(|e| (e.date, e)).collect()
    }

    /// Temperature entries confirming ovulation on cycle day 15 for a
    /// cycle starting at `start`: 6 low readings on days 10-15, 3 high
    /// readings on days 16-18.
    fn shift_entries(start: &str) -> Vec<DailyEntry> {
        let start = date(start);
        let temps = [36.4, 36.3, 36.45, 36.5, 36.35, 36.4, 36.65, 36.7, 36.75];
        temps
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                temp_entry(&(start + Duration::days(9 + i as i64)).to_string(), t)
            })
            .collect()
    }

    #[test]
    fn test_empty_log_yields_default_result() {
        let result = evaluate(&log(vec![]), &EngineSettings::default(), date("2024-01-01"));
        assert!(result.cycles.is_empty());
        assert!(result.current_cycle.is_none());
        assert!(result.future_cycles.is_empty());
        assert_eq!(result.statistics.median_cycle_length, 28.0);
        assert_eq!(result.today, DayPrediction::empty(date("2024-01-01")));
    }

    #[test]
    fn test_single_flow_day_scenario() {
        // One medium flow day only: one open interval, default
        // statistics, menstruation while inside the period length
        let entries = log(vec![flow_entry("2024-01-01", FlowLevel::Medium)]);
        let result = evaluate(&entries, &EngineSettings::default(), date("2024-01-03"));

        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].interval.start_date, date("2024-01-01"));
        assert_eq!(result.cycles[0].interval.end_date, None);
        assert_eq!(result.cycles[0].realized_length, None);

        assert_eq!(result.statistics.median_cycle_length, 28.0);
        assert_eq!(result.statistics.std_dev_cycle_length, 1.5);

        let phase = result.current_cycle.unwrap();
        assert_eq!(phase.state, CycleState::Menstruation);
        assert_eq!(phase.elapsed_days, 3);
        assert!(result.today.is_period_day);
        assert_eq!(result.today.fertility_level, 0);
    }

    #[test]
    fn test_two_confirmed_cycles_scenario() {
        // Two prior 28-day cycles with clean day-15 shifts, new period
        // starting today
        let mut entries = vec![
            flow_entry("2024-01-01", FlowLevel::Medium),
            flow_entry("2024-01-29", FlowLevel::Medium),
            flow_entry("2024-02-26", FlowLevel::Medium),
        ];
        entries.extend(shift_entries("2024-01-01"));
        entries.extend(shift_entries("2024-01-29"));
        let entries = log(entries);

        let result = evaluate(&entries, &EngineSettings::default(), date("2024-02-26"));

        assert_eq!(result.cycles.len(), 3);
        assert_eq!(result.cycles[2].interval.start_date, date("2024-02-26"));
        assert_eq!(result.cycles[0].realized_length, Some(28));
        assert_eq!(result.cycles[1].realized_length, Some(28));
        assert_eq!(
            result.cycles[0].biomarker.ovulation,
            Some(date("2024-01-15"))
        );
        assert_eq!(
            result.cycles[1].biomarker.ovulation,
            Some(date("2024-02-12"))
        );

        assert_eq!(result.statistics.median_cycle_length, 28.0);
        assert_eq!(result.statistics.median_luteal_length, 13.0);
        assert_eq!(result.statistics.cycle_count, 2);

        let phase = result.current_cycle.unwrap();
        assert_eq!(phase.state, CycleState::Menstruation);
        assert_eq!(phase.elapsed_days, 1);
    }

    #[test]
    fn test_lh_peak_two_days_ago_scenario() {
        let mut peak = DailyEntry::new(date("2024-01-12"));
        peak.lh_test = Some(LhTestResult::Peak);
        let entries = log(vec![flow_entry("2024-01-01", FlowLevel::Medium), peak]);

        let result = evaluate(&entries, &EngineSettings::default(), date("2024-01-14"));
        assert_eq!(
            result.current_cycle.unwrap().state,
            CycleState::PostOvuPending
        );
    }

    #[test]
    fn test_implausible_cycle_excluded_from_stats_but_kept() {
        // 60-day gap: implausible length stays in history, statistics
        // fall back to defaults (no usable length remains)
        let entries = log(vec![
            flow_entry("2024-01-01", FlowLevel::Medium),
            flow_entry("2024-03-01", FlowLevel::Medium),
        ]);
        let result = evaluate(&entries, &EngineSettings::default(), date("2024-03-02"));

        assert_eq!(result.cycles.len(), 2);
        assert_eq!(result.cycles[0].realized_length, Some(60));
        assert_eq!(result.statistics.cycle_count, 0);
        assert_eq!(result.statistics.median_cycle_length, 28.0);
    }

    #[test]
    fn test_forecast_fields_for_fresh_cycle() {
        let entries = log(vec![flow_entry("2024-01-01", FlowLevel::Medium)]);
        let result = evaluate(&entries, &EngineSettings::default(), date("2024-01-03"));

        assert_eq!(result.future_cycles.len(), 6);
        assert_eq!(result.future_cycles[0].start, date("2024-01-29"));
        assert_eq!(result.today.next_period_start, Some(date("2024-01-29")));
        assert_eq!(result.today.days_until_period, Some(26));
        // Current cycle's estimated ovulation: start + 14 days
        assert_eq!(result.today.next_ovulation, Some(date("2024-01-15")));
        assert_eq!(result.today.days_until_ovulation, Some(12));
    }

    #[test]
    fn test_stale_log_still_finds_future_ovulation() {
        let entries = log(vec![flow_entry("2023-06-01", FlowLevel::Medium)]);
        let result = evaluate(&entries, &EngineSettings::default(), date("2024-01-10"));

        let next = result.today.next_ovulation.unwrap();
        assert!(next >= date("2024-01-10"));
        assert!(result.future_cycles.len() >= 6);
    }

    #[test]
    fn test_fertile_window_day_prediction() {
        // Day 13 of a default cycle: fertile window, near-peak level
        let entries = log(vec![flow_entry("2024-01-01", FlowLevel::Medium)]);
        let result = evaluate(&entries, &EngineSettings::default(), date("2024-01-13"));

        assert_eq!(result.today.state, Some(CycleState::FertileMid));
        assert!(result.today.fertile);
        assert_eq!(result.today.fertility_level, 3);
        assert!(!result.today.is_period_day);

        // Day 10: fertile but not peak
        let result = evaluate(&entries, &EngineSettings::default(), date("2024-01-10"));
        assert_eq!(result.today.fertility_level, 2);
        assert!(!result.today.is_ovulation_day);

        // Day 14: the estimated ovulation day itself
        let result = evaluate(&entries, &EngineSettings::default(), date("2024-01-14"));
        assert!(result.today.is_ovulation_day);
    }

    #[test]
    fn test_confirmed_cycle_is_infertile_after_shift() {
        let mut entries = vec![flow_entry("2024-01-01", FlowLevel::Medium)];
        entries.extend(shift_entries("2024-01-01"));
        let entries = log(entries);

        let result = evaluate(&entries, &EngineSettings::default(), date("2024-01-20"));
        assert_eq!(result.today.state, Some(CycleState::OvuConfirmed));
        assert!(!result.today.fertile);
        assert_eq!(result.today.fertility_level, 0);
        // Confirmed ovulation in the past: next ovulation comes from the
        // forecast
        let next = result.today.next_ovulation.unwrap();
        assert!(next >= date("2024-01-20"));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let mut entries = vec![
            flow_entry("2024-01-01", FlowLevel::Medium),
            flow_entry("2024-01-29", FlowLevel::Medium),
        ];
        entries.extend(shift_entries("2024-01-01"));
        let entries = log(entries);

        let settings = EngineSettings::default();
        let first = evaluate(&entries, &settings, date("2024-02-10"));
        let second = evaluate(&entries, &settings, date("2024-02-10"));
        assert_eq!(first, second);
    }
}
