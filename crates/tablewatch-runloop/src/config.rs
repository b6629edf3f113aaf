//! Run settings derived from the loaded configuration.

use std::sync::Arc;
use std::time::Duration;

use tablewatch_config::Config;
use tablewatch_core::{Clock, SystemClock};
use tablewatch_protocols::RecordSchema;

use crate::error::RunError;

/// Everything the orchestrator needs from the configuration, already
/// converted to domain types.
#[derive(Clone)]
pub struct RunSettings {
    pub schema: RecordSchema,
    /// CSS selector for the source table.
    pub table_locator: String,
    pub row_label_column: String,
    pub timezone: String,
    /// Deadline for one content read.
    pub read_timeout: Duration,
    /// Session age that triggers rotation.
    pub lifetime: Duration,
    /// Minimum wall time between cycle starts.
    pub min_cycle: Duration,
    /// Read + extraction time that schedules a refresh.
    pub slow_cycle: Duration,
    /// Capacity of the persister's retry buffer.
    pub retry_buffer: usize,
    /// Print the progress line to stdout.
    pub progress: bool,
    /// Clock used to date normalized timestamps.
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RunSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSettings")
            .field("targets", &self.schema.len())
            .field("table_locator", &self.table_locator)
            .field("row_label_column", &self.row_label_column)
            .field("timezone", &self.timezone)
            .field("read_timeout", &self.read_timeout)
            .field("lifetime", &self.lifetime)
            .field("min_cycle", &self.min_cycle)
            .field("slow_cycle", &self.slow_cycle)
            .field("retry_buffer", &self.retry_buffer)
            .finish_non_exhaustive()
    }
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Result<Self, RunError> {
        let schema = config
            .record_schema()
            .map_err(|e| RunError::Settings(e.to_string()))?;

        Ok(Self {
            schema,
            table_locator: config.source.table.css(),
            row_label_column: config.source.row_label_column.clone(),
            timezone: config.source.timezone.clone(),
            read_timeout: config.browser.read_timeout(),
            lifetime: config.browser.lifetime(),
            min_cycle: seconds("run.min_cycle_secs", config.run.min_cycle_secs)?,
            slow_cycle: seconds("run.slow_cycle_secs", config.run.slow_cycle_secs)?,
            retry_buffer: config.storage.retry_buffer,
            progress: true,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock, e.g. with a [`tablewatch_core::FixedClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration, RunError> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| RunError::Settings(format!("{} must be a non-negative number, got {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablewatch_protocols::{FieldMapping, TargetDefinition};

    fn config() -> Config {
        let mut config = Config::default();
        config.source.table.attribute = "id".to_string();
        config.source.table.value = "bonds".to_string();
        config.source.row_label_column = "Country".to_string();
        config.targets = vec![TargetDefinition::new(
            "German10yrbond",
            vec![
                FieldMapping::new("UTCTime", "Germany", "Time"),
                FieldMapping::new("Value", "Germany", "Yield"),
            ],
        )];
        config
    }

    #[test]
    fn test_from_config() {
        let settings = RunSettings::from_config(&config()).unwrap();
        assert_eq!(settings.table_locator, r#"table[id="bonds"]"#);
        assert_eq!(settings.min_cycle, Duration::from_millis(10_500));
        assert_eq!(settings.slow_cycle, Duration::from_secs(3));
        assert_eq!(settings.read_timeout, Duration::from_secs(5));
        assert_eq!(settings.lifetime, Duration::from_secs(1680));
        assert_eq!(settings.retry_buffer, 1000);
        assert!(settings.progress);
    }

    #[test]
    fn test_negative_interval_rejected() {
        let mut config = config();
        config.run.min_cycle_secs = -1.0;
        let err = RunSettings::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("run.min_cycle_secs"));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let mut config = config();
        config.targets.clear();
        assert!(matches!(
            RunSettings::from_config(&config),
            Err(RunError::Settings(_))
        ));
    }
}
