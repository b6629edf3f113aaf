//! CDP error types.

use thiserror::Error;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to the browser.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Nothing answering on the debugging endpoint.
    #[error("Browser not available at {0}")]
    EndpointUnavailable(String),

    /// The browser process could not be started.
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol error.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (for endpoint discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Navigation failed.
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// JavaScript execution error.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// Timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Session closed.
    #[error("Session closed")]
    SessionClosed,

    /// Invalid response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local I/O (profile directory, screenshots).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CdpError {
    /// Whether the error means the page or browser connection is gone.
    pub fn is_target_gone(&self) -> bool {
        match self {
            CdpError::SessionClosed | CdpError::WebSocket(_) => true,
            CdpError::Protocol { message, .. } => {
                let message = message.to_ascii_lowercase();
                message.contains("no target")
                    || message.contains("target closed")
                    || message.contains("session with given id not found")
            }
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}
