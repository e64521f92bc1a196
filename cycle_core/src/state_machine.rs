//! Current-cycle state machine.
//!
//! Classifies the in-progress cycle into one of seven fertility states
//! from the biomarker analysis plus elapsed-day heuristics. Rules are
//! evaluated in order against an explicit `today`; the first match wins.
//! A later temperature shift upgrades `PostOvuPending`/
//! `AnovulatorySuspected` to `OvuConfirmed` retroactively, simply because
//! rule 1 outranks rule 2 on the next evaluation.

use crate::{
    BiomarkerResult, CyclePhaseState, CycleState, CycleStatistics, DailyEntry, EngineSettings,
    OvulationConfidence,
};
use chrono::NaiveDate;

/// Days after an LH surge during which a confirming temperature shift is
/// still awaited before the cycle is flagged anovulatory-suspected.
pub const POST_SURGE_CONFIRM_WINDOW: i64 = 4;

/// Days before the estimated ovulation day that open the fertile window.
pub const FERTILE_WINDOW_DAYS: i64 = 5;

/// Classify the open cycle against `today`.
///
/// `entries` are the open cycle's entries ascending by date; `biomarker`
/// is the analyzer's partial result for the same entries. A new cycle
/// start resets the classification to `Menstruation` by construction
/// (day 1 always satisfies the elapsed-day rule).
pub fn classify(
    start_date: NaiveDate,
    entries: &[&DailyEntry],
    biomarker: &BiomarkerResult,
    stats: &CycleStatistics,
    settings: &EngineSettings,
    today: NaiveDate,
) -> CyclePhaseState {
    let elapsed_days = (today - start_date).num_days() + 1;
    let state = current_state(entries, biomarker, stats, settings, elapsed_days, today);

    tracing::debug!(
        "Cycle started {}, day {}: {:?}",
        start_date,
        elapsed_days,
        state
    );

    CyclePhaseState {
        start_date,
        elapsed_days,
        state,
        ovulation: biomarker.ovulation,
        coverline: biomarker.coverline,
    }
}

fn current_state(
    entries: &[&DailyEntry],
    biomarker: &BiomarkerResult,
    stats: &CycleStatistics,
    settings: &EngineSettings,
    elapsed_days: i64,
    today: NaiveDate,
) -> CycleState {
    // Rule 1: a confirmed temperature shift settles the cycle
    if biomarker.confidence == OvulationConfidence::Confirmed {
        return CycleState::OvuConfirmed;
    }

    // Rule 2: an LH surge without a confirming shift. The most recent
    // surge drives the clock; a fresh surge restarts it.
    if let Some(surge) = entries
        .iter()
        .rev()
        .find(|e| e.lh_test.map_or(false, |t| t.is_surge()))
    {
        let days_since = (today - surge.date).num_days();
        return if days_since <= 0 {
            CycleState::PeakLh
        } else if days_since <= POST_SURGE_CONFIRM_WINDOW {
            CycleState::PostOvuPending
        } else {
            CycleState::AnovulatorySuspected
        };
    }

    // Rule 3: still within the expected period
    if elapsed_days <= settings.period_length {
        return CycleState::Menstruation;
    }

    // Rule 4: inside the statistically fertile window
    let ovulation_day = stats.estimated_ovulation_day();
    if elapsed_days >= ovulation_day - FERTILE_WINDOW_DAYS && elapsed_days <= ovulation_day {
        return CycleState::FertileMid;
    }

    CycleState::PreFertile
}
