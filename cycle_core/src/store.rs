//! Entry-log persistence with file locking.
//!
//! The engine itself performs no I/O; this is the CLI collaborator's
//! store. One JSON file holds the full map of daily entries keyed by
//! date, read under a shared lock and replaced atomically on save.

use crate::{DailyEntry, Error, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// The complete daily entry log
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct EntryLog {
    pub entries: BTreeMap<NaiveDate, DailyEntry>,
}

impl EntryLog {
    /// Load the entry log from a file with shared locking
    ///
    /// Returns an empty log if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an empty log.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No entry log found, starting empty");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open entry log {:?}: {}. Starting empty.", path, e);
                return Ok(Self::default());
            }
        };

        // Acquire shared lock for reading
        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock entry log {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read entry log {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<EntryLog>(&contents) {
            Ok(log) => {
                tracing::debug!("Loaded {} entries from {:?}", log.entries.len(), path);
                Ok(log)
            }
            Err(e) => {
                tracing::warn!("Failed to parse entry log {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the entry log to a file with exclusive locking
    ///
    /// Atomically writes the log by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Create unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            Error::Store("entry log path missing parent".into())
        })?)?;

        // Acquire exclusive lock on the temp file to serialize concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        // Atomically replace old log file
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} entries to {:?}", self.entries.len(), path);
        Ok(())
    }

    /// Insert or merge one validated entry (at most one record per date)
    pub fn upsert(&mut self, entry: DailyEntry) -> Result<()> {
        entry.validate()?;
        self.entries.insert(entry.date, entry);
        Ok(())
    }

    /// Load the log, modify it, and save it back atomically
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut EntryLog) -> Result<()>,
    {
        let mut log = Self::load(path)?;
        f(&mut log)?;
        log.save(path)?;
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlowLevel;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample_entry(s: &str) -> DailyEntry {
        let mut entry = DailyEntry::new(date(s));
        entry.temperature = Some(36.55);
        entry.flow = Some(FlowLevel::Medium);
        entry
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("entries.json");

        let mut log = EntryLog::default();
        log.upsert(sample_entry("2024-01-01")).unwrap();
        log.upsert(sample_entry("2024-01-02")).unwrap();

        log.save(&log_path).unwrap();
        let loaded = EntryLog::load(&log_path).unwrap();

        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(
            loaded.entries[&date("2024-01-01")].temperature,
            Some(36.55)
        );
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("nonexistent.json");

        let log = EntryLog::load(&log_path).unwrap();
        assert!(log.entries.is_empty());
    }

    #[test]
    fn test_corrupted_log_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("corrupted.json");

        std::fs::write(&log_path, "{ invalid json }").unwrap();

        let log = EntryLog::load(&log_path).unwrap();
        assert!(log.entries.is_empty());
    }

    #[test]
    fn test_upsert_replaces_same_date() {
        let mut log = EntryLog::default();
        log.upsert(sample_entry("2024-01-01")).unwrap();

        let mut replacement = sample_entry("2024-01-01");
        replacement.temperature = Some(36.8);
        log.upsert(replacement).unwrap();

        assert_eq!(log.entries.len(), 1);
        assert_eq!(
            log.entries[&date("2024-01-01")].temperature,
            Some(36.8)
        );
    }

    #[test]
    fn test_upsert_rejects_implausible_entry() {
        let mut log = EntryLog::default();
        let mut entry = sample_entry("2024-01-01");
        entry.temperature = Some(12.0);
        assert!(log.upsert(entry).is_err());
        assert!(log.entries.is_empty());
    }

    #[test]
    fn test_update_pattern() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("entries.json");

        EntryLog::default().save(&log_path).unwrap();

        EntryLog::update(&log_path, |log| {
            log.upsert(sample_entry("2024-02-01"))
        })
        .unwrap();

        let loaded = EntryLog::load(&log_path).unwrap();
        assert!(loaded.entries.contains_key(&date("2024-02-01")));
    }

    #[test]
    fn test_atomic_save_leaves_no_stray_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("entries.json");

        EntryLog::default().save(&log_path).unwrap();

        assert!(log_path.exists());
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "entries.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only entries.json, found extras: {:?}",
            extras
        );
    }
}
