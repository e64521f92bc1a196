//! Configuration file support for Zyklus.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/zyklus/config.toml`.

use crate::{EngineSettings, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub cycle: CycleConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Cycle assumptions used before enough history exists
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_period_length")]
    pub period_length: i64,

    #[serde(default = "default_cycle_length")]
    pub cycle_length: i64,

    #[serde(default = "default_luteal_phase")]
    pub luteal_phase: i64,

    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            period_length: default_period_length(),
            cycle_length: default_cycle_length(),
            luteal_phase: default_luteal_phase(),
            forecast_horizon: default_forecast_horizon(),
        }
    }
}

impl CycleConfig {
    /// Engine settings derived from the configured assumptions
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            period_length: self.period_length,
            cycle_length: self.cycle_length,
            luteal_phase: self.luteal_phase,
            forecast_horizon: self.forecast_horizon,
        }
    }

    /// Reject settings no forecast could be built from
    pub fn validate(&self) -> Result<()> {
        if self.cycle_length <= self.luteal_phase {
            return Err(Error::Config(format!(
                "cycle_length ({}) must exceed luteal_phase ({})",
                self.cycle_length, self.luteal_phase
            )));
        }
        if self.period_length < 1 || self.forecast_horizon < 1 {
            return Err(Error::Config(
                "period_length and forecast_horizon must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("zyklus")
}

fn default_period_length() -> i64 {
    5
}

fn default_cycle_length() -> i64 {
    crate::stats::DEFAULT_CYCLE_LENGTH
}

fn default_luteal_phase() -> i64 {
    crate::stats::DEFAULT_LUTEAL_LENGTH
}

fn default_forecast_horizon() -> usize {
    crate::projector::DEFAULT_HORIZON
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.cycle.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("zyklus").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
