#![forbid(unsafe_code)]

//! Core domain model and cycle inference engine for Zyklus.
//!
//! This crate provides:
//! - Domain types (daily entries, cycle intervals, forecasts)
//! - Cycle segmentation and biomarker analysis
//! - History statistics and the current-cycle state machine
//! - Future projection and the engine facade
//! - Entry-log persistence (JSON and CSV) for the CLI collaborator

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod store;
pub mod csv_log;
pub mod segmenter;
pub mod biomarker;
pub mod stats;
pub mod state_machine;
pub mod projector;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::EntryLog;
pub use engine::evaluate;
