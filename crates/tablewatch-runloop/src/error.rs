//! Fatal run errors.

use tablewatch_core::{ExtractError, ProjectError};
use tablewatch_protocols::{SessionError, StoreError};
use thiserror::Error;

use crate::state::OrchestratorState;

/// A condition that ends the run. Every variant except `Settings` and
/// `AlreadyTerminated` names the state it happened in.
#[derive(Debug, Error)]
pub enum RunError {
    /// Settings could not be derived from the configuration.
    #[error("Invalid run settings: {0}")]
    Settings(String),

    #[error("{state}: storage failed: {source}")]
    Store {
        state: OrchestratorState,
        #[source]
        source: StoreError,
    },

    #[error("{state}: session failed: {source}")]
    Session {
        state: OrchestratorState,
        #[source]
        source: SessionError,
    },

    /// The read failed again after the one permitted refresh.
    #[error("RUNNING: read failed after refresh ({first}): {second}")]
    RecoveryFailed {
        first: SessionError,
        #[source]
        second: SessionError,
    },

    #[error("{state}: extraction failed: {source}")]
    Extract {
        state: OrchestratorState,
        #[source]
        source: ExtractError,
    },

    #[error("{state}: projection failed: {source}")]
    Project {
        state: OrchestratorState,
        #[source]
        source: ProjectError,
    },

    #[error("Signal handler setup failed: {0}")]
    SignalSetup(String),

    #[error("Orchestrator already ran")]
    AlreadyTerminated,
}

impl RunError {
    /// The state the failure happened in, when it happened inside a run.
    pub fn state(&self) -> Option<OrchestratorState> {
        match self {
            RunError::Store { state, .. }
            | RunError::Session { state, .. }
            | RunError::Extract { state, .. }
            | RunError::Project { state, .. } => Some(*state),
            RunError::RecoveryFailed { .. } => Some(OrchestratorState::Running),
            RunError::Settings(_) | RunError::SignalSetup(_) | RunError::AlreadyTerminated => None,
        }
    }
}
