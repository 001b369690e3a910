//! Error taxonomy for the simulation kernel
//!
//! Only `PoolExhausted` and level-data errors are allowed to escape a
//! simulation step. Everything else is recovered where it happens and logged.

use thiserror::Error;

use crate::sim::state::{GamePhase, PhaseEvent};

/// Errors raised by the simulation kernel
#[derive(Debug, Error)]
pub enum SimError {
    /// A pool at capacity had no inactive entity to recycle (sizing bug)
    #[error("{pool} pool exhausted: all {capacity} entities are active")]
    PoolExhausted { pool: &'static str, capacity: usize },

    /// A phase event that is not legal from the current phase
    #[error("illegal transition from {from:?} on {event:?}")]
    IllegalStateTransition { from: GamePhase, event: PhaseEvent },

    /// A level was started while another one was still in progress
    #[error("cannot start level {requested} while level {current} is in progress")]
    InvalidLevelTransition { current: u32, requested: u32 },

    /// A bullet overlapped more than one target with equal precedence
    #[error("bullet {bullet} overlaps {targets} targets at once")]
    CollisionAmbiguity { bullet: u32, targets: usize },

    /// Level data failed validation
    #[error("level {level} is malformed: {reason}")]
    MalformedLevel { level: u32, reason: String },

    /// The level source has no level with this id
    #[error("level {0} does not exist")]
    UnknownLevel(u32),

    /// Settings failed validation
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Whether this error must halt the loop
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SimError::IllegalStateTransition { .. } | SimError::CollisionAmbiguity { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors_are_not_fatal() {
        let err = SimError::IllegalStateTransition {
            from: GamePhase::Menu,
            event: PhaseEvent::TogglePause,
        };
        assert!(!err.is_fatal());

        let err = SimError::CollisionAmbiguity {
            bullet: 3,
            targets: 2,
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_pool_exhausted_is_fatal() {
        let err = SimError::PoolExhausted {
            pool: "bullet",
            capacity: 2,
        };
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "bullet pool exhausted: all 2 entities are active"
        );
    }
}
