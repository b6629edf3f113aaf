//! Rendering session protocol.
//!
//! A [`PageSource`] owns one live session against the watched page. The
//! engine behind it is chosen once, at construction, from [`EngineKind`];
//! callers only ever see this trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Supported rendering engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Google Chrome over the DevTools protocol.
    Chrome,
    /// Chromium over the DevTools protocol.
    Chromium,
    /// Microsoft Edge over the DevTools protocol.
    Edge,
    /// Plain HTTP fetch; no script rendering.
    Http,
}

impl EngineKind {
    /// Whether the engine renders through a browser process.
    pub fn is_browser(&self) -> bool {
        !matches!(self, EngineKind::Http)
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Chrome => write!(f, "chrome"),
            EngineKind::Chromium => write!(f, "chromium"),
            EngineKind::Edge => write!(f, "edge"),
            EngineKind::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(EngineKind::Chrome),
            "chromium" => Ok(EngineKind::Chromium),
            "edge" => Ok(EngineKind::Edge),
            "http" => Ok(EngineKind::Http),
            other => Err(format!("unknown engine '{}'", other)),
        }
    }
}

/// A session that yields the current rendered markup of one page.
#[async_trait]
pub trait PageSource: Send {
    /// The engine backing this source.
    fn kind(&self) -> EngineKind;

    /// Start a fresh session and load the configured page.
    ///
    /// Any previous session is replaced wholesale.
    async fn acquire(&mut self) -> Result<(), SessionError>;

    /// Return the current markup, failing with [`SessionError::Timeout`]
    /// once `timeout` elapses and [`SessionError::WindowLost`] when the
    /// page handle is gone.
    async fn read_content(&mut self, timeout: Duration) -> Result<String, SessionError>;

    /// Tear down the current session (failures are logged, not returned)
    /// and acquire a new one.
    async fn refresh(&mut self) -> Result<(), SessionError>;

    /// Time since the last successful `acquire`.
    fn age(&self) -> Duration;

    /// Best-effort teardown. Safe to call more than once.
    async fn shutdown(&mut self) -> Result<(), SessionError>;
}
