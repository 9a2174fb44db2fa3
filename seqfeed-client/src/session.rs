//! Fetch session state machine.
//!
//! [`Session`] performs no I/O. The driver feeds it one [`SessionEvent`] at a
//! time through [`Session::dispatch`] and executes the [`SessionCommand`] it
//! returns. This keeps every transition synchronous and testable.
//!
//! ```text
//! Idle -> Connecting -> Streaming -> Closed -> Complete
//!             ^            |           |
//!             |            v           |
//!             |         Closing -------+
//!             +-----------------------(gaps remain)
//! ```

use crate::error::{ClientError, IncompleteReason};
use crate::reconciler::{Observation, Phase, SequenceReconciler};
use seqfeed_core::{Record, RequestFrame};
use std::collections::VecDeque;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing started.
    Idle,
    /// Waiting for a connection to be established.
    Connecting,
    /// Connected; requests sent and records flowing.
    Streaming,
    /// We asked the driver to close the connection.
    Closing,
    /// The round's connection is gone.
    Closed,
    /// Dataset is gap-free and handed to persistence.
    Complete,
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A connection was established.
    Connected,
    /// A complete record arrived.
    Record(Record),
    /// The connection closed.
    Closed,
    /// No data arrived within the idle timeout.
    TimedOut,
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Record(_) => "record",
            Self::Closed => "closed",
            Self::TimedOut => "timed out",
        }
    }
}

/// Output of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Open a new connection.
    Connect,
    /// Write a request on the current connection.
    Send(RequestFrame),
    /// Close the current connection.
    Close,
    /// Persist the completed collection.
    Persist,
}

/// Two-phase fetch session: one bulk round, then recovery rounds.
#[derive(Debug)]
pub struct Session {
    reconciler: SequenceReconciler,
    state: SessionState,
    round: u32,
    max_recovery_rounds: u32,
    queue: VecDeque<RequestFrame>,
    awaiting: Option<u32>,
}

impl Session {
    /// Creates a session allowing up to `max_recovery_rounds` recovery rounds.
    #[must_use]
    pub fn new(max_recovery_rounds: u32) -> Self {
        Self::with_reconciler(SequenceReconciler::new(), max_recovery_rounds)
    }

    /// Creates a session around an existing reconciler.
    #[must_use]
    pub fn with_reconciler(reconciler: SequenceReconciler, max_recovery_rounds: u32) -> Self {
        Self {
            reconciler,
            state: SessionState::Idle,
            round: 0,
            max_recovery_rounds,
            queue: VecDeque::new(),
            awaiting: None,
        }
    }

    /// Starts the session.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidState`] unless the session is idle.
    pub fn start(&mut self) -> Result<SessionCommand, ClientError> {
        if self.state != SessionState::Idle {
            return Err(ClientError::InvalidState {
                state: self.state,
                event: "start",
            });
        }
        self.state = SessionState::Connecting;
        Ok(SessionCommand::Connect)
    }

    /// Advances the machine by one event.
    ///
    /// # Returns
    /// The next command to execute, or `None` to wait for the next event.
    ///
    /// # Errors
    /// Returns an error when the session cannot continue: a rejected record, a
    /// timeout, exhausted recovery rounds, or an event the state does not
    /// accept.
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<Option<SessionCommand>, ClientError> {
        match (self.state, event) {
            (SessionState::Connecting, SessionEvent::Connected) => Ok(Some(self.on_connected())),
            (SessionState::Streaming | SessionState::Closing, SessionEvent::Record(record)) => {
                self.on_record(record)
            }
            (SessionState::Streaming | SessionState::Closing, SessionEvent::Closed) => {
                self.on_closed().map(Some)
            }
            (SessionState::Streaming, SessionEvent::TimedOut) => {
                tracing::error!(round = self.round, "idle timeout, aborting round");
                Err(self.incomplete(IncompleteReason::IdleTimeout))
            }
            (state, event) => Err(ClientError::InvalidState {
                state,
                event: event.name(),
            }),
        }
    }

    fn on_connected(&mut self) -> SessionCommand {
        self.state = SessionState::Streaming;

        match self.reconciler.phase() {
            Phase::Bulk => {
                tracing::info!("Requesting all records...");
                SessionCommand::Send(RequestFrame::all())
            }
            Phase::Recovering => {
                self.queue.clear();
                let mut unrequestable = Vec::new();
                for sequence in self.reconciler.missing() {
                    match RequestFrame::one(sequence) {
                        Ok(request) => self.queue.push_back(request),
                        Err(_) => unrequestable.push(sequence),
                    }
                }
                if !unrequestable.is_empty() {
                    tracing::warn!(
                        round = self.round,
                        "sequences beyond {} cannot be requested: {:?}",
                        RequestFrame::MAX_SEQUENCE,
                        unrequestable
                    );
                }
                tracing::info!(
                    round = self.round,
                    "Requesting {} missing sequences",
                    self.queue.len()
                );
                self.next_request()
            }
        }
    }

    fn on_record(&mut self, record: Record) -> Result<Option<SessionCommand>, ClientError> {
        let sequence = record.sequence;
        let observation = self.reconciler.observe(record)?;
        if let Observation::Gap { from, to } = observation {
            tracing::info!(from, to, "missed sequences");
        }

        if self.state == SessionState::Streaming && self.awaiting == Some(sequence) {
            self.awaiting = None;
            return Ok(Some(self.next_request()));
        }
        Ok(None)
    }

    // Skips queued sequences that were filled while waiting on another one.
    fn next_request(&mut self) -> SessionCommand {
        while let Some(request) = self.queue.pop_front() {
            if self.reconciler.is_missing(request.sequence()) {
                self.awaiting = Some(request.sequence());
                return SessionCommand::Send(request);
            }
        }
        self.state = SessionState::Closing;
        SessionCommand::Close
    }

    fn on_closed(&mut self) -> Result<SessionCommand, ClientError> {
        tracing::info!(round = self.round, "Connection closed.");
        self.state = SessionState::Closed;
        self.queue.clear();
        self.awaiting = None;

        if self.reconciler.is_complete() {
            self.state = SessionState::Complete;
            return Ok(SessionCommand::Persist);
        }

        if !self.has_requestable() {
            tracing::error!(
                rounds = self.round,
                "remaining sequences cannot be requested: {:?}",
                self.reconciler.missing()
            );
            return Err(self.incomplete(IncompleteReason::Unrequestable));
        }

        if self.round >= self.max_recovery_rounds {
            tracing::error!(
                rounds = self.round,
                "missing sequences remain after final round: {:?}",
                self.reconciler.missing()
            );
            return Err(self.incomplete(IncompleteReason::RoundsExhausted));
        }

        if self.reconciler.phase() == Phase::Bulk {
            self.reconciler.begin_recovery();
        }
        self.round += 1;
        self.state = SessionState::Connecting;
        Ok(SessionCommand::Connect)
    }

    fn has_requestable(&self) -> bool {
        self.reconciler
            .first_missing()
            .is_some_and(|s| s <= RequestFrame::MAX_SEQUENCE)
    }

    fn incomplete(&self, reason: IncompleteReason) -> ClientError {
        ClientError::RecoveryIncomplete {
            missing: self.reconciler.missing(),
            rounds: self.round,
            reason,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.reconciler.phase()
    }

    /// Returns the number of recovery rounds started.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Returns the sequence whose response is outstanding, if any.
    #[must_use]
    pub fn awaiting(&self) -> Option<u32> {
        self.awaiting
    }

    /// Returns the reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &SequenceReconciler {
        &self.reconciler
    }

    /// Consumes the session, returning the reconciler.
    #[must_use]
    pub fn into_reconciler(self) -> SequenceReconciler {
        self.reconciler
    }
}
