//! Error types for fetch operations.

use crate::reconciler::ReconcileError;
use crate::session::SessionState;
use crate::sink::PersistError;
use seqfeed_transport::TransportError;
use std::fmt;
use thiserror::Error;

/// Why a fetch ended with sequences still missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// The server went silent while a round was streaming.
    IdleTimeout,
    /// Every allowed recovery round ran and gaps remain.
    RoundsExhausted,
    /// The remaining sequences do not fit in a recovery request.
    Unrequestable,
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleTimeout => f.write_str("idle timeout"),
            Self::RoundsExhausted => f.write_str("recovery rounds exhausted"),
            Self::Unrequestable => f.write_str("sequences beyond recovery request range"),
        }
    }
}

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error, including malformed frames.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A record was rejected by the reconciler.
    #[error("reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Connecting failed on every allowed attempt.
    #[error("gave up connecting after {attempts} attempts: {source}")]
    MaxConnectAttempts {
        /// Number of attempts made.
        attempts: usize,
        /// Error from the last attempt.
        #[source]
        source: TransportError,
    },

    /// The dataset still has gaps and the session will not try further.
    #[error("recovery incomplete after {rounds} rounds ({reason}), missing {missing:?}")]
    RecoveryIncomplete {
        /// Sequences still absent.
        missing: Vec<u32>,
        /// Recovery rounds completed.
        rounds: u32,
        /// Why the session stopped.
        reason: IncompleteReason,
    },

    /// Persisting the completed dataset failed.
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),

    /// An event or command the current state does not accept.
    #[error("unexpected {event} event in state {state:?}")]
    InvalidState {
        /// Session state when the event arrived.
        state: SessionState,
        /// Event name.
        event: &'static str,
    },
}

impl ClientError {
    /// Returns true if the run stopped because gaps could not be filled.
    #[must_use]
    pub fn is_recovery_incomplete(&self) -> bool {
        matches!(self, Self::RecoveryIncomplete { .. })
    }
}
