//! Configuration management for smilecheck.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::clock::Zone;
use crate::error::{Error, Result};
use crate::scan::ScanOptions;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "smilecheck";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "smilecheck.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SMILECHECK_`, `__` between
///    nested keys)
/// 2. TOML config file at `~/.config/smilecheck/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Scanning configuration.
    pub scan: ScanConfig,
    /// Calendar configuration.
    pub clock: ClockConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/smilecheck/smilecheck.db`
    pub database_path: Option<PathBuf>,
}

/// Scan-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Interval between captured frames in milliseconds.
    pub capture_interval_ms: u64,
    /// Treat the first registered user as recognized after a delay.
    pub simulate_recognition: bool,
    /// Delay before a simulated recognition in milliseconds.
    pub simulated_recognition_delay_ms: u64,
}

/// Calendar configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// UTC offset that decides calendar days, e.g. `+02:00` or `utc`.
    /// Unset means the system's local time zone.
    pub utc_offset: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            capture_interval_ms: 2000,
            simulate_recognition: false,
            simulated_recognition_delay_ms: 5000,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SMILECHECK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.scan.capture_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "capture_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.scan.simulate_recognition && self.scan.simulated_recognition_delay_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "simulated_recognition_delay_ms must be greater than 0".to_string(),
            });
        }

        self.zone()?;
        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the capture interval as a Duration.
    #[must_use]
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.scan.capture_interval_ms)
    }

    /// Scan timing, with simulation enabled by config or by `force_simulation`.
    #[must_use]
    pub fn scan_options(&self, force_simulation: bool) -> ScanOptions {
        let simulate = self.scan.simulate_recognition || force_simulation;
        ScanOptions {
            capture_interval: self.capture_interval(),
            simulate_after: simulate
                .then(|| Duration::from_millis(self.scan.simulated_recognition_delay_ms)),
        }
    }

    /// The calendar zone for deciding "today".
    ///
    /// # Errors
    ///
    /// Returns an error if `clock.utc_offset` cannot be parsed.
    pub fn zone(&self) -> Result<Zone> {
        match &self.clock.utc_offset {
            Some(text) => Zone::parse(text),
            None => Ok(Zone::Local),
        }
    }
}
