//! Cycle segmentation: partitioning the entry log into cycle intervals.
//!
//! Walks the chronological entry sequence and opens a new interval on each
//! qualifying menstrual-flow day. Short gaps between flow days inside one
//! period must not be read as separate cycles, and a spotting blip
//! mid-cycle must not be misread as the next period's day 1.

use crate::{CycleInterval, DailyEntry};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// Minimum days since the current cycle start before a flow day can open
/// a new interval.
pub const MIN_DAYS_SINCE_CYCLE_START: i64 = 14;

/// Minimum days since the last non-spotting flow day before a flow day can
/// open a new interval.
pub const MIN_DAYS_SINCE_LAST_FLOW: i64 = 10;

/// Partition the entry log into non-overlapping cycle intervals, oldest
/// first.
///
/// A non-spotting flow entry starts a new interval iff no interval is open,
/// or at least [`MIN_DAYS_SINCE_CYCLE_START`] days have elapsed since the
/// current start *and* at least [`MIN_DAYS_SINCE_LAST_FLOW`] days have
/// elapsed since the last non-spotting flow day. Spotting entries never
/// open an interval; days before the first qualifying flow day belong to
/// no interval. The last interval is always left open-ended.
pub fn segment(entries: &BTreeMap<NaiveDate, DailyEntry>) -> Vec<CycleInterval> {
    let mut intervals = Vec::new();
    let mut current_start: Option<NaiveDate> = None;
    let mut last_flow: Option<NaiveDate> = None;

    for (&date, entry) in entries {
        let Some(flow) = entry.flow else { continue };
        if !flow.is_true_flow() {
            // Spotting folds into whichever interval is open, or is
            // dropped if none is open yet.
            continue;
        }

        let starts_new = match (current_start, last_flow) {
            (None, _) => true,
            (Some(start), Some(flow_day)) => {
                (date - start).num_days() >= MIN_DAYS_SINCE_CYCLE_START
                    && (date - flow_day).num_days() >= MIN_DAYS_SINCE_LAST_FLOW
            }
            // An open interval always has a flow day on record (its start)
            (Some(_), None) => false,
        };

        if starts_new {
            if let Some(start) = current_start {
                intervals.push(CycleInterval {
                    start_date: start,
                    end_date: Some(date - Duration::days(1)),
                });
            }
            tracing::debug!("New cycle interval starting {}", date);
            current_start = Some(date);
        }
        last_flow = Some(date);
    }

    if let Some(start) = current_start {
        intervals.push(CycleInterval {
            start_date: start,
            end_date: None,
        });
    }

    tracing::debug!("Segmented {} entries into {} cycles", entries.len(), intervals.len());
    intervals
}

/// Collect references to the entries that fall inside one interval,
/// ascending by date.
pub fn entries_in<'a>(
    entries: &'a BTreeMap<NaiveDate, DailyEntry>,
    interval: &CycleInterval,
) -> Vec<&'a DailyEntry> {
    match interval.end_date {
        Some(end) => entries.range(interval.start_date..=end).map(|(_, e)| e).collect(),
        None => entries.range(interval.start_date..).map(|(_, e)| e).collect(),
    }
}
