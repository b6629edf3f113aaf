//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        Self::resolve_paths(&mut config);
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    fn resolve_paths(config: &mut Config) {
        config.storage.path = Self::expand_pathbuf(&config.storage.path);
        config.logging.dir = Self::expand_pathbuf(&config.logging.dir);
        if let Some(dir) = config.browser.screenshot_dir.as_mut() {
            *dir = Self::expand_pathbuf(dir);
        }
        if let Some(exe) = config.browser.executable.as_mut() {
            *exe = Self::expand_pathbuf(exe);
        }
    }

    fn expand_pathbuf(path: &Path) -> PathBuf {
        PathBuf::from(Self::expand_path(&path.to_string_lossy()))
    }

    /// Expand shell-style paths (e.g., `~/.tablewatch`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tablewatch_protocols::EngineKind;
    use tempfile::NamedTempFile;

    const BONDS: &str = r#"
        [source]
        url = "https://example.com/bonds"
        row_label_column = "Country"

        [source.table]
        attribute = "id"
        value = "bonds"

        [[targets]]
        name = "German10yrbond"
        fields = [
            { name = "UTCTime", row = "Germany", column = "Time" },
            { name = "Value", row = "Germany", column = "Yield" },
        ]

        [[targets]]
        name = "French10yrbond"
        fields = [
            { name = "UTCTime", row = "France", column = "Time" },
            { name = "Value", row = "France", column = "Yield" },
        ]
    "#;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.source.timezone, "GMT");
        assert_eq!(config.source.temporal_field, "UTCTime");
        assert_eq!(config.browser.engine, EngineKind::Chrome);
        assert_eq!(config.browser.read_timeout_secs, 5);
        assert_eq!(config.browser.lifetime_secs, 1680);
        assert_eq!(config.run.min_cycle_secs, 10.5);
        assert_eq!(config.storage.retry_buffer, 1000);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_load_targets_in_order() {
        let config = ConfigLoader::load_str(BONDS).unwrap();
        assert_eq!(config.source.table.value, "bonds");
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].name, "German10yrbond");
        assert_eq!(config.targets[1].name, "French10yrbond");
        assert_eq!(config.targets[0].fields[1].column, "Yield");

        let schema = config.record_schema().unwrap();
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_load_browser_section() {
        let content = r#"
            [browser]
            engine = "http"
            read_timeout_secs = 7
            navigation_attempts = 3
            user_agent = "tablewatch-test"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.browser.engine, EngineKind::Http);
        assert_eq!(config.browser.read_timeout().as_secs(), 7);
        assert_eq!(config.browser.navigation_attempts, 3);
        assert_eq!(config.browser.user_agent.as_deref(), Some("tablewatch-test"));
        assert_eq!(config.browser.window_width, 1024);
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let content = r#"
            [browser]
            engine = "phantomjs"
        "#;
        assert!(matches!(
            ConfigLoader::load_str(content),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[run]").unwrap();
        writeln!(file, "min_cycle_secs = 2.5").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.run.min_cycle_secs, 2.5);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/tablewatch.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn test_storage_path_tilde_expanded() {
        let content = r#"
            [storage]
            path = "~/data/bonds.db"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        let path = config.storage.path.to_string_lossy().to_string();
        assert!(!path.starts_with('~'));
        assert!(path.ends_with("data/bonds.db"));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: unique test-only variable
        unsafe {
            std::env::set_var("TABLEWATCH_TEST_DB", "/tmp/tw.db");
        }
        let content = "[storage]\npath = \"${TABLEWATCH_TEST_DB}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/tmp/tw.db"));
        unsafe {
            std::env::remove_var("TABLEWATCH_TEST_DB");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_TABLEWATCH_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(v)) if v == "NONEXISTENT_TABLEWATCH_VAR_12345"));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        assert_eq!(ConfigLoader::expand_env_vars(content).unwrap(), content);
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(ConfigLoader::expand_path("/usr/local/bin"), "/usr/local/bin");
        let expanded = ConfigLoader::expand_path("~/test");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/test"));
    }
}
