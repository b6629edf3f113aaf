//! Configuration validation.

use std::collections::HashSet;

use regex::Regex;
use tablewatch_protocols::{EngineKind, is_supported_timezone};
use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse into a single error if any errors were recorded.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.is_valid() {
            return Ok(self.warnings);
        }
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid(joined))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let mut result = ValidationResult::default();

        Self::validate_source(config, &mut result);
        Self::validate_browser(config, &mut result);
        Self::validate_run(config, &mut result);
        Self::validate_targets(config, &identifier, &mut result);

        Ok(result)
    }

    fn validate_source(config: &Config, result: &mut ValidationResult) {
        let source = &config.source;

        if source.url.trim().is_empty() {
            result.add_error(ValidationError::new("source.url", "URL cannot be empty"));
        } else {
            match Url::parse(&source.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => result.add_error(ValidationError::new(
                    "source.url",
                    format!("unsupported scheme '{}', expected http or https", url.scheme()),
                )),
                Err(e) => result.add_error(ValidationError::new(
                    "source.url",
                    format!("invalid URL: {}", e),
                )),
            }
        }

        if source.table.attribute.trim().is_empty() || source.table.value.trim().is_empty() {
            result.add_error(ValidationError::new(
                "source.table",
                "table locator needs both attribute and value",
            ));
        }

        if source.row_label_column.trim().is_empty() {
            result.add_error(ValidationError::new(
                "source.row_label_column",
                "row label column cannot be empty",
            ));
        }

        if !is_supported_timezone(&source.timezone) {
            result.add_error(ValidationError::new(
                "source.timezone",
                format!("unsupported timezone '{}'", source.timezone),
            ));
        }
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        let browser = &config.browser;

        if browser.read_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "browser.read_timeout_secs",
                "read timeout must be greater than 0",
            ));
        }

        if browser.lifetime_secs == 0 {
            result.add_error(ValidationError::new(
                "browser.lifetime_secs",
                "session lifetime must be greater than 0",
            ));
        } else if (browser.lifetime_secs as f64) < config.run.min_cycle_secs {
            result.add_warning(ValidationWarning::new(
                "browser.lifetime_secs",
                "session lifetime is shorter than the cycle interval; the session will be rotated every cycle",
            ));
        }

        if browser.navigation_attempts == 0 {
            result.add_error(ValidationError::new(
                "browser.navigation_attempts",
                "navigation attempts must be greater than 0",
            ));
        }

        if browser.engine == EngineKind::Http && !browser.headless {
            result.add_warning(ValidationWarning::new(
                "browser.headless",
                "headless is ignored by the http engine",
            ));
        }

        if browser.remote_endpoint.is_some() && browser.executable.is_some() {
            result.add_warning(ValidationWarning::new(
                "browser.executable",
                "executable is ignored when remote_endpoint is set",
            ));
        }

        if let Some(endpoint) = &browser.remote_endpoint {
            if Url::parse(endpoint).is_err() {
                result.add_error(ValidationError::new(
                    "browser.remote_endpoint",
                    format!("invalid endpoint URL '{}'", endpoint),
                ));
            }
        }
    }

    fn validate_run(config: &Config, result: &mut ValidationResult) {
        if !is_positive(config.run.min_cycle_secs) {
            result.add_error(ValidationError::new(
                "run.min_cycle_secs",
                "cycle interval must be positive",
            ));
        }

        if !is_positive(config.run.slow_cycle_secs) {
            result.add_error(ValidationError::new(
                "run.slow_cycle_secs",
                "slow cycle threshold must be positive",
            ));
        }
    }

    fn validate_targets(config: &Config, identifier: &Regex, result: &mut ValidationResult) {
        let temporal = config.source.temporal_field.as_str();

        if !identifier.is_match(temporal) {
            result.add_error(ValidationError::new(
                "source.temporal_field",
                format!("'{}' is not a valid column identifier", temporal),
            ));
        }

        if config.targets.is_empty() {
            result.add_error(ValidationError::new("targets", "no targets defined"));
            return;
        }

        let mut names = HashSet::new();
        for (i, target) in config.targets.iter().enumerate() {
            let path = format!("targets[{}]", i);

            if !identifier.is_match(&target.name) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("'{}' is not a valid table name", target.name),
                ));
            }
            if !names.insert(target.name.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("duplicate target name '{}'", target.name),
                ));
            }

            if target.fields.is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.fields", path),
                    "target has no fields",
                ));
                continue;
            }

            if target.fields[0].name != temporal {
                result.add_error(ValidationError::new(
                    format!("{}.fields[0]", path),
                    format!("first field must be the temporal field '{}'", temporal),
                ));
            }

            let mut fields = HashSet::new();
            for (j, field) in target.fields.iter().enumerate() {
                let field_path = format!("{}.fields[{}]", path, j);

                if !identifier.is_match(&field.name) {
                    result.add_error(ValidationError::new(
                        format!("{}.name", field_path),
                        format!("'{}' is not a valid column name", field.name),
                    ));
                }
                if field.row.trim().is_empty() || field.column.trim().is_empty() {
                    result.add_error(ValidationError::new(
                        field_path.clone(),
                        "field needs both row and column",
                    ));
                }
                if !fields.insert(field.name.as_str()) {
                    let message = if field.name == temporal {
                        format!("temporal field '{}' appears more than once", temporal)
                    } else {
                        format!("duplicate field name '{}'", field.name)
                    };
                    result.add_error(ValidationError::new(field_path, message));
                }
            }
        }
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
