//! Orchestrator lifecycle states.

/// Where the orchestrator is in its lifecycle. Transitions only move
/// forward; TERMINATED is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum OrchestratorState {
    /// Connecting storage, creating tables, acquiring the session.
    Starting = 0,
    /// Cycling.
    Running = 1,
    /// Releasing the session and the store.
    CleaningUp = 2,
    /// Done. There is no restart in place.
    Terminated = 3,
}

impl OrchestratorState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Starting, CleaningUp)
                | (Running, CleaningUp)
                | (CleaningUp, Terminated)
        )
    }
}

impl From<u8> for OrchestratorState {
    fn from(v: u8) -> Self {
        match v {
            0 => OrchestratorState::Starting,
            1 => OrchestratorState::Running,
            2 => OrchestratorState::CleaningUp,
            _ => OrchestratorState::Terminated,
        }
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorState::Starting => write!(f, "STARTING"),
            OrchestratorState::Running => write!(f, "RUNNING"),
            OrchestratorState::CleaningUp => write!(f, "CLEANING_UP"),
            OrchestratorState::Terminated => write!(f, "TERMINATED"),
        }
    }
}
