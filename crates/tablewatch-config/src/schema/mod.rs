//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tablewatch_protocols::{RecordSchema, SchemaError, TargetDefinition};

mod schema_infra;
mod schema_source;

pub use schema_infra::*;
pub use schema_source::*;

/// Base directory for default state (database, logs).
pub(crate) fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tablewatch")
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub targets: Vec<TargetDefinition>,
}

impl Config {
    /// Build the validated record schema from `[[targets]]`.
    pub fn record_schema(&self) -> Result<RecordSchema, SchemaError> {
        RecordSchema::new(self.source.temporal_field.clone(), self.targets.clone())
    }
}

/// Cycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Minimum seconds between the starts of two cycles.
    #[serde(default = "default_min_cycle_secs")]
    pub min_cycle_secs: f64,

    /// Read + extraction time after which the session is refreshed at the
    /// end of the cycle.
    #[serde(default = "default_slow_cycle_secs")]
    pub slow_cycle_secs: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_cycle_secs: default_min_cycle_secs(),
            slow_cycle_secs: default_slow_cycle_secs(),
        }
    }
}

fn default_min_cycle_secs() -> f64 {
    10.5
}

fn default_slow_cycle_secs() -> f64 {
    3.0
}

/// Log sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files.
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Log file name prefix.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Number of daily log files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            file_prefix: default_file_prefix(),
            max_files: default_max_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    default_home().join("logs")
}

fn default_file_prefix() -> String {
    "tablewatch".to_string()
}

fn default_max_files() -> usize {
    30
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
