//! Engine and storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use tablewatch_protocols::EngineKind;

/// Rendering engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Which engine backs the session.
    #[serde(default = "default_engine")]
    pub engine: EngineKind,

    /// Explicit browser executable; searched for when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Run the browser without a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Attach to an already running browser (e.g. `http://localhost:9222`)
    /// instead of launching one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<String>,

    /// User agent override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Hard deadline for one content read.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Session age after which it is rotated.
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: u64,

    #[serde(default = "default_navigation_attempts")]
    pub navigation_attempts: u32,

    #[serde(default = "default_navigation_backoff_ms")]
    pub navigation_backoff_ms: u64,

    /// Where to save a screenshot when the popup cannot be dismissed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            executable: None,
            headless: default_headless(),
            remote_endpoint: None,
            user_agent: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            read_timeout_secs: default_read_timeout_secs(),
            lifetime_secs: default_lifetime_secs(),
            navigation_attempts: default_navigation_attempts(),
            navigation_backoff_ms: default_navigation_backoff_ms(),
            screenshot_dir: None,
        }
    }
}

impl BrowserConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    pub fn navigation_backoff(&self) -> Duration {
        Duration::from_millis(self.navigation_backoff_ms)
    }
}

fn default_engine() -> EngineKind {
    EngineKind::Chrome
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1024
}

fn default_window_height() -> u32 {
    768
}

fn default_read_timeout_secs() -> u64 {
    5
}

fn default_lifetime_secs() -> u64 {
    1680
}

fn default_navigation_attempts() -> u32 {
    10
}

fn default_navigation_backoff_ms() -> u64 {
    2000
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Maximum number of rows held for retry while storage is unavailable.
    #[serde(default = "default_retry_buffer")]
    pub retry_buffer: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            retry_buffer: default_retry_buffer(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    super::default_home().join("tablewatch.db")
}

fn default_retry_buffer() -> usize {
    1000
}
