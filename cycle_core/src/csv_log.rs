//! CSV import/export for the native entry-log format.
//!
//! One row per day, categorical fields in their snake_case wire form,
//! symptom and mood tags joined with `;`. Import is tolerant: rows that
//! fail to parse or validate are logged and skipped so one typo cannot
//! block a whole file.

use crate::{
    CervicalMucus, DailyEntry, Error, FlowLevel, Intercourse, LhTestResult, Result,
};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

const TAG_SEPARATOR: char = ';';

/// CSV row format for the native entry log
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: String,
    temperature: Option<f64>,
    exclude_temp: Option<bool>,
    flow: Option<String>,
    mucus: Option<String>,
    lh_test: Option<String>,
    intercourse: Option<String>,
    symptoms: Option<String>,
    mood: Option<String>,
    notes: Option<String>,
}

fn parse_enum<T: serde::de::DeserializeOwned>(field: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| Error::Entry(format!("unknown {} value: {}", field, value)))
}

fn enum_to_string<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

fn split_tags(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(TAG_SEPARATOR)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn join_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(&TAG_SEPARATOR.to_string()))
    }
}

impl TryFrom<CsvRow> for DailyEntry {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let date: NaiveDate = row
            .date
            .parse()
            .map_err(|_| Error::Entry(format!("invalid date: {}", row.date)))?;

        let flow = row
            .flow
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_enum::<FlowLevel>("flow", s))
            .transpose()?;
        let mucus = row
            .mucus
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_enum::<CervicalMucus>("mucus", s))
            .transpose()?;
        let lh_test = row
            .lh_test
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_enum::<LhTestResult>("lh_test", s))
            .transpose()?;
        let intercourse = row
            .intercourse
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_enum::<Intercourse>("intercourse", s))
            .transpose()?;

        let entry = DailyEntry {
            date,
            temperature: row.temperature,
            exclude_temp: row.exclude_temp.unwrap_or(false),
            flow,
            mucus,
            lh_test,
            intercourse,
            symptoms: split_tags(row.symptoms),
            mood: split_tags(row.mood),
            notes: row.notes.filter(|s| !s.is_empty()),
        };
        entry.validate()?;
        Ok(entry)
    }
}

impl From<&DailyEntry> for CsvRow {
    fn from(entry: &DailyEntry) -> Self {
        CsvRow {
            date: entry.date.to_string(),
            temperature: entry.temperature,
            exclude_temp: if entry.exclude_temp { Some(true) } else { None },
            flow: entry.flow.as_ref().map(enum_to_string),
            mucus: entry.mucus.as_ref().map(enum_to_string),
            lh_test: entry.lh_test.as_ref().map(enum_to_string),
            intercourse: entry.intercourse.as_ref().map(enum_to_string),
            symptoms: join_tags(&entry.symptoms),
            mood: join_tags(&entry.mood),
            notes: entry.notes.clone(),
        }
    }
}

/// Import entries from a native-format CSV file
///
/// Bad rows are logged and skipped; the count of skipped rows is
/// returned alongside the parsed entries.
pub fn import_entries(path: &Path) -> Result<(Vec<DailyEntry>, usize)> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut entries = Vec::new();
    let mut skipped = 0;
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match DailyEntry::try_from(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Skipping CSV row: {}", e);
                    skipped += 1;
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
                skipped += 1;
            }
        }
    }

    tracing::info!("Imported {} entries ({} skipped) from {:?}", entries.len(), skipped, path);
    Ok((entries, skipped))
}

/// Export entries to a native-format CSV file, ascending by date
pub fn export_entries<'a, I>(path: &Path, entries: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a DailyEntry>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    let mut count = 0;
    for entry in entries {
        writer.serialize(CsvRow::from(entry))?;
        count += 1;
    }
    writer.flush()?;

    tracing::info!("Exported {} entries to {:?}", count, path);
    Ok(count)
}
