//! Session-level and per-turn sub-state vocabulary.

use std::fmt;

use rehearse_types::session::SessionStatus;

/// Session-level state: `Configured → Running → Completed`, with
/// `Abandoned` reachable from any non-terminal state via idle timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Configured,
    Running,
    Completed,
    Abandoned,
}

impl SessionPhase {
    /// Project onto the persisted status vocabulary.
    pub fn status(self) -> SessionStatus {
        match self {
            SessionPhase::Configured | SessionPhase::Running => SessionStatus::Active,
            SessionPhase::Completed => SessionStatus::Completed,
            SessionPhase::Abandoned => SessionStatus::Abandoned,
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Configured => write!(f, "configured"),
            SessionPhase::Running => write!(f, "running"),
            SessionPhase::Completed => write!(f, "completed"),
            SessionPhase::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Sub-state of one turn inside `Running`. Internal: serialized by the
/// session mutex, never observable mid-transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingUser,
    ProcessingUser,
    AwaitingAssistant,
    TurnCommitted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_status_projection() {
        assert_eq!(SessionPhase::Configured.status(), SessionStatus::Active);
        assert_eq!(SessionPhase::Running.status(), SessionStatus::Active);
        assert_eq!(SessionPhase::Completed.status(), SessionStatus::Completed);
        assert_eq!(SessionPhase::Abandoned.status(), SessionStatus::Abandoned);
    }
}
