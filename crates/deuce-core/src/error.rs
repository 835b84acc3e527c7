use crate::types::{MatchId, MatchStatus, PlayerId};
use thiserror::Error;

/// A command that can never succeed against the current match. Rejected
/// before anything is mutated; resubmitting it unchanged is pointless.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("player '{0}' is not part of this match")]
    InvalidPlayer(PlayerId),

    #[error("match has not started")]
    MatchNotStarted,

    #[error("match is already {0}")]
    MatchAlreadyComplete(MatchStatus),

    #[error("cannot {action} a match that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: MatchStatus,
    },

    #[error("a match needs two distinct players, got '{0}' twice")]
    DuplicatePlayer(PlayerId),

    #[error("invalid match format: {0}")]
    InvalidFormat(String),

    #[error("match '{0}' already exists")]
    DuplicateMatch(MatchId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UndoError {
    #[error("nothing to undo: history is at its initial snapshot")]
    NothingToUndo,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ScoringError),

    #[error("Undo error: {0}")]
    Undo(#[from] UndoError),

    #[error("Concurrency error: expected version {expected}, current version is {actual}")]
    Concurrency { expected: u64, actual: u64 },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Match not found: {0}")]
    NotFound(MatchId),

    #[error("Coordinator for match {0} is unavailable")]
    Unavailable(MatchId),
}

impl EngineError {
    /// Whether resubmitting the identical command may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Concurrency { .. } | Self::Persistence(_) | Self::Unavailable(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(EngineError::Persistence("disk full".into()).is_retryable());
        assert!(EngineError::Concurrency {
            expected: 3,
            actual: 4
        }
        .is_retryable());
        assert!(!EngineError::from(UndoError::NothingToUndo).is_retryable());
        assert!(!EngineError::from(ScoringError::MatchNotStarted).is_retryable());
    }

    #[test]
    fn messages_name_the_status() {
        let e = ScoringError::MatchAlreadyComplete(MatchStatus::Completed);
        assert_eq!(e.to_string(), "match is already completed");
    }
}
