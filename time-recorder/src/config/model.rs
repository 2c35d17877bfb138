// src/config/model.rs

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on `recorder.max_buffer_size`.
pub const MAX_BUFFER_CAPACITY: usize = 1_000_000;
/// Upper bound on `recorder.batch_size`.
pub const MAX_BATCH_SIZE: usize = 1_000;

/// Top-level runtime config
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging:  LoggingConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]            pub enable: bool,
    #[serde(default)]            pub file:   Option<String>,
    #[serde(default = "default_level")] pub level: String,
}
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: None, level: default_level() }
    }
}

/// Mirror of the `[database]` table. Only `path` is mandatory.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path:               String,
    #[serde(default)]
    pub purge_on_restart:   bool,
    #[serde(default = "default_synchronous")]
    pub synchronous:        String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms:    u64,
    #[serde(default = "default_journal_size_limit")]
    pub journal_size_limit: u64,
}
fn default_synchronous() -> String { "NORMAL".into() }
fn default_busy_timeout_ms() -> u64 { 1_000 }
fn default_journal_size_limit() -> u64 { 50_000_000 }

impl DatabaseConfig {
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            purge_on_restart: false,
            synchronous: default_synchronous(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_size_limit: default_journal_size_limit(),
        }
    }
}

/// Mirror of the `[recorder]` table: capture cadence, buffer sizing and
/// flush budget.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub enabled:                bool,
    pub record_interval_ms:     u64,
    pub reconnect_interval_ms:  u64,
    pub max_buffer_size:        usize,
    pub batch_size:             usize,
    pub batch_write_timeout_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled:                true,
            record_interval_ms:     1_000,
            reconnect_interval_ms:  5_000,
            max_buffer_size:        100_000,
            batch_size:             100,
            batch_write_timeout_ms: 30_000,
        }
    }
}

impl RecorderConfig {
    pub fn record_interval(&self) -> Duration {
        Duration::from_millis(self.record_interval_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn batch_write_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_write_timeout_ms)
    }

    /// Reject values the recorder cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("recorder.record_interval_ms", self.record_interval_ms)?;
        positive("recorder.reconnect_interval_ms", self.reconnect_interval_ms)?;
        positive("recorder.batch_write_timeout_ms", self.batch_write_timeout_ms)?;
        within("recorder.max_buffer_size", self.max_buffer_size, 1, MAX_BUFFER_CAPACITY)?;
        within("recorder.batch_size", self.batch_size, 1, MAX_BATCH_SIZE)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid { field, reason: "must be greater than 0".into() });
    }
    Ok(())
}

fn within(field: &'static str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is outside {min}..={max}"),
        });
    }
    Ok(())
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
