//! Core domain types for the Zyklus cycle engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Daily observation entries and their categorical scales
//! - Cycle intervals and per-cycle biomarker results
//! - History statistics and the current-cycle phase state
//! - Projected future cycles and the aggregate engine result
//!
//! All dates are `chrono::NaiveDate`: whole calendar days with no
//! time-of-day component, so day arithmetic cannot pick up local/UTC
//! boundary errors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ============================================================================
// Observation Scales
// ============================================================================

/// Menstrual flow intensity for one day
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowLevel {
    Light,
    Medium,
    Heavy,
    Spotting,
}

impl FlowLevel {
    /// Spotting is noted but never treated as a period day for
    /// segmentation purposes.
    pub fn is_true_flow(self) -> bool {
        self != FlowLevel::Spotting
    }
}

/// Cervical mucus category (symptothermal observation scale)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CervicalMucus {
    Dry,
    Sticky,
    Creamy,
    Watery,
    Eggwhite,
}

/// Ovulation (LH) test strip result
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LhTestResult {
    Negative,
    Positive,
    Peak,
}

impl LhTestResult {
    /// Positive and peak results both count as a detected LH surge.
    pub fn is_surge(self) -> bool {
        matches!(self, LhTestResult::Positive | LhTestResult::Peak)
    }
}

/// Recorded intercourse for one day
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intercourse {
    Protected,
    Unprotected,
}

// ============================================================================
// Daily Entry
// ============================================================================

/// Lowest temperature accepted at the entry boundary, in °C.
pub const MIN_PLAUSIBLE_TEMP: f64 = 34.0;
/// Highest temperature accepted at the entry boundary, in °C.
pub const MAX_PLAUSIBLE_TEMP: f64 = 42.0;

/// One calendar date's observations.
///
/// Every field except `date` is optional: absence means "not observed",
/// never "observed as zero". At most one entry exists per date.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailyEntry {
    pub date: NaiveDate,
    /// Basal body temperature in °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Omit an otherwise-valid temperature from biomarker analysis
    /// (illness, disturbed sleep, alcohol)
    #[serde(default)]
    pub exclude_temp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mucus: Option<CervicalMucus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lh_test: Option<LhTestResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercourse: Option<Intercourse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mood: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DailyEntry {
    /// Create an empty entry for a date
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            temperature: None,
            exclude_temp: false,
            flow: None,
            mucus: None,
            lh_test: None,
            intercourse: None,
            symptoms: Vec::new(),
            mood: Vec::new(),
            notes: None,
        }
    }

    /// Temperature reading usable for biomarker analysis, if any
    pub fn usable_temperature(&self) -> Option<f64> {
        if self.exclude_temp {
            None
        } else {
            self.temperature
        }
    }

    /// Boundary validation: the engine assumes entries are plausible, so
    /// persistence and import reject implausible values up front.
    pub fn validate(&self) -> Result<()> {
        if let Some(temp) = self.temperature {
            if !(MIN_PLAUSIBLE_TEMP..=MAX_PLAUSIBLE_TEMP).contains(&temp) {
                return Err(Error::Entry(format!(
                    "temperature {:.2} °C on {} outside plausible range [{}, {}]",
                    temp, self.date, MIN_PLAUSIBLE_TEMP, MAX_PLAUSIBLE_TEMP
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Cycle Intervals and Biomarker Results
// ============================================================================

/// A contiguous cycle span.
///
/// `start_date` is a qualifying flow day; `end_date` is the day before the
/// next cycle's start, or `None` for the open, in-progress cycle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleInterval {
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl CycleInterval {
    /// Whether a date falls inside this interval
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }
}

/// How an ovulation date was established for a cycle
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OvulationConfidence {
    /// Sustained temperature shift over the coverline
    Confirmed,
    /// Inferred from an ovulation-test surge, no confirming shift
    Inferred,
    #[default]
    NotDetected,
}

/// Per-cycle biomarker analysis output
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct BiomarkerResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovulation: Option<NaiveDate>,
    /// Baseline temperature the shift was measured against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverline: Option<f64>,
    pub confidence: OvulationConfidence,
}

/// One row of cycle history: the interval plus everything the engine
/// derived for it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CycleRecord {
    pub interval: CycleInterval,
    /// Days between this start and the next; `None` for the open cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_length: Option<i64>,
    pub biomarker: BiomarkerResult,
}

// ============================================================================
// Statistics and Phase State
// ============================================================================

/// Robust central tendency and spread of the cycle history
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CycleStatistics {
    pub mean_cycle_length: f64,
    pub median_cycle_length: f64,
    pub std_dev_cycle_length: f64,
    pub mean_luteal_length: f64,
    pub median_luteal_length: f64,
    /// Number of realized cycles contributing to the estimate
    pub cycle_count: usize,
}

impl CycleStatistics {
    /// Estimated 1-based ovulation day for a cycle following the history
    pub fn estimated_ovulation_day(&self) -> i64 {
        (self.median_cycle_length - self.median_luteal_length).round() as i64
    }
}

/// Fertility state of the in-progress cycle
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Menstruation,
    PreFertile,
    FertileMid,
    PeakLh,
    PostOvuPending,
    OvuConfirmed,
    AnovulatorySuspected,
}

/// Snapshot of the open cycle evaluated against "today"
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CyclePhaseState {
    pub start_date: NaiveDate,
    /// 1-based day count, inclusive of the start day
    pub elapsed_days: i64,
    pub state: CycleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovulation: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverline: Option<f64>,
}

// ============================================================================
// Forecast Types
// ============================================================================

/// A projected future cycle with ±1 σ day bounds
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FutureCycle {
    pub start: NaiveDate,
    pub start_low: NaiveDate,
    pub start_high: NaiveDate,
    pub ovulation: NaiveDate,
    pub ovulation_low: NaiveDate,
    pub ovulation_high: NaiveDate,
    pub fertile_start: NaiveDate,
    pub fertile_end: NaiveDate,
}

/// Today's single-day classification for the dashboard
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayPrediction {
    pub date: NaiveDate,
    /// `None` when no cycle has been observed yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<CycleState>,
    pub fertile: bool,
    /// 0 = infertile .. 3 = peak
    pub fertility_level: u8,
    pub is_period_day: bool,
    pub is_ovulation_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_period_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_period: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_ovulation: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_ovulation: Option<i64>,
}

impl DayPrediction {
    /// Placeholder prediction for a date with no cycle history
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            state: None,
            fertile: false,
            fertility_level: 0,
            is_period_day: false,
            is_ovulation_day: false,
            next_period_start: None,
            days_until_period: None,
            next_ovulation: None,
            days_until_ovulation: None,
        }
    }
}

// ============================================================================
// Settings and Engine Result
// ============================================================================

/// User settings consumed by the engine, used only as fallbacks before
/// enough history exists
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineSettings {
    /// Typical period length in days
    pub period_length: i64,
    /// Assumed cycle length before history exists
    pub cycle_length: i64,
    /// Assumed luteal-phase length before confirmed ovulations exist
    pub luteal_phase: i64,
    /// How many future cycles to project
    pub forecast_horizon: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            period_length: 5,
            cycle_length: crate::stats::DEFAULT_CYCLE_LENGTH,
            luteal_phase: crate::stats::DEFAULT_LUTEAL_LENGTH,
            forecast_horizon: crate::projector::DEFAULT_HORIZON,
        }
    }
}

/// Aggregate output of one engine invocation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngineResult {
    pub statistics: CycleStatistics,
    /// All observed cycles, oldest first; the last one is open
    pub cycles: Vec<CycleRecord>,
    /// `None` when no qualifying flow day has been logged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_cycle: Option<CyclePhaseState>,
    pub today: DayPrediction,
    pub future_cycles: Vec<FutureCycle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_spotting_is_not_true_flow() {
        assert!(!FlowLevel::Spotting.is_true_flow());
        assert!(FlowLevel::Light.is_true_flow());
        assert!(FlowLevel::Heavy.is_true_flow());
    }

    #[test]
    fn test_usable_temperature_respects_exclusion() {
        let mut entry = DailyEntry::new(date("2024-01-01"));
        entry.temperature = Some(36.5);
        assert_eq!(entry.usable_temperature(), Some(36.5));

        entry.exclude_temp = true;
        assert_eq!(entry.usable_temperature(), None);
    }

    #[test]
    fn test_validate_rejects_implausible_temperature() {
        let mut entry = DailyEntry::new(date("2024-01-01"));
        entry.temperature = Some(63.5);
        assert!(entry.validate().is_err());

        entry.temperature = Some(36.5);
        assert!(entry.validate().is_ok());

        entry.temperature = None;
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_interval_contains() {
        let closed = CycleInterval {
            start_date: date("2024-01-01"),
            end_date: Some(date("2024-01-28")),
        };
        assert!(closed.contains(date("2024-01-01")));
        assert!(closed.contains(date("2024-01-28")));
        assert!(!closed.contains(date("2024-01-29")));

        let open = CycleInterval {
            start_date: date("2024-01-29"),
            end_date: None,
        };
        assert!(open.contains(date("2024-06-01")));
        assert!(!open.contains(date("2024-01-28")));
    }

    #[test]
    fn test_entry_serde_roundtrip() {
        let mut entry = DailyEntry::new(date("2024-03-05"));
        entry.temperature = Some(36.72);
        entry.flow = Some(FlowLevel::Spotting);
        entry.lh_test = Some(LhTestResult::Peak);
        entry.symptoms = vec!["cramps".into()];

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: DailyEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, parsed);
        // Categorical values stay snake_case on the wire
        assert!(json.contains("\"spotting\""));
        assert!(json.contains("\"peak\""));
    }
}
