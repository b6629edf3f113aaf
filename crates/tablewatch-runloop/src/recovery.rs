//! Bounded content read with a single refresh-and-retry.

use std::time::Duration;

use tablewatch_protocols::PageSource;
use tokio::time::Instant;
use tracing::{error, warn};

use crate::error::RunError;
use crate::state::OrchestratorState;

/// A successful read.
#[derive(Debug, Clone)]
pub struct ContentRead {
    pub markup: String,
    /// The session was refreshed to obtain this read.
    pub refreshed: bool,
    /// Time spent in the read that succeeded.
    pub elapsed: Duration,
}

/// Read the page within `timeout`.
///
/// On `Timeout` or `WindowLost` the session is refreshed once and the read
/// retried once. Anything else, a failed refresh or a failed retry is fatal.
pub async fn read_with_recovery(
    source: &mut dyn PageSource,
    timeout: Duration,
) -> Result<ContentRead, RunError> {
    let started = Instant::now();
    let first = match source.read_content(timeout).await {
        Ok(markup) => {
            return Ok(ContentRead {
                markup,
                refreshed: false,
                elapsed: started.elapsed(),
            });
        }
        Err(e) if e.is_recoverable() => e,
        Err(e) => {
            return Err(RunError::Session {
                state: OrchestratorState::Running,
                source: e,
            });
        }
    };

    warn!(error = %first, "Session read failed, refreshing once");
    source.refresh().await.map_err(|e| {
        error!(error = %e, "Session refresh failed");
        RunError::Session {
            state: OrchestratorState::Running,
            source: e,
        }
    })?;

    let started = Instant::now();
    match source.read_content(timeout).await {
        Ok(markup) => Ok(ContentRead {
            markup,
            refreshed: true,
            elapsed: started.elapsed(),
        }),
        Err(second) => {
            error!(first = %first, second = %second, "Session read failed after refresh");
            Err(RunError::RecoveryFailed { first, second })
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
