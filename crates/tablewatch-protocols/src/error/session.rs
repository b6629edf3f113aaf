//! Rendering session errors.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The content read did not finish before its deadline.
    #[error("Content read exceeded deadline of {0:?}")]
    Timeout(Duration),

    /// The session's window or page handle is gone.
    #[error("Browser window lost: {0}")]
    WindowLost(String),

    /// The engine could not be started or attached to.
    #[error("Engine failed to start: {0}")]
    EngineStart(String),

    /// Every navigation attempt failed.
    #[error("Navigation to {url} failed after {attempts} attempts")]
    NavigationExhausted { url: String, attempts: u32 },

    /// Any other failure talking to the engine.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The session was used before `acquire` or after `shutdown`.
    #[error("Session is not active")]
    Closed,
}

impl SessionError {
    /// Whether the caller may attempt one refresh-and-retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Timeout(_) | SessionError::WindowLost(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = SessionError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_navigation_exhausted_display() {
        let err = SessionError::NavigationExhausted {
            url: "https://example.com".to_string(),
            attempts: 10,
        };
        let display = err.to_string();
        assert!(display.contains("https://example.com"));
        assert!(display.contains("10 attempts"));
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(SessionError::Timeout(Duration::from_secs(1)).is_recoverable());
        assert!(SessionError::WindowLost("gone".to_string()).is_recoverable());
        assert!(!SessionError::EngineStart("x".to_string()).is_recoverable());
        assert!(!SessionError::Transport("x".to_string()).is_recoverable());
        assert!(!SessionError::Closed.is_recoverable());
    }
}
