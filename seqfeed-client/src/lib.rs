//! # seqfeed Client
//!
//! Gap-recovering fetch client for the sequenced record feed.
//!
//! This crate provides:
//! - [`SequenceReconciler`] - gap detection and absolute placement of records
//! - [`Session`] - the bulk/recovery state machine, free of I/O
//! - [`Fetcher`] - drives a [`Session`] over a transport and persists the result
//! - Connect backoff and record sinks

pub mod backoff;
pub mod builder;
pub mod error;
pub mod reconciler;
pub mod session;
pub mod sink;

pub use backoff::{BackoffConfig, ConnectBackoff};
pub use builder::{FetchBuilder, FetchConfig, FetchReport, Fetcher};
pub use error::{ClientError, IncompleteReason};
pub use reconciler::{Observation, Phase, ReconcileError, SequenceReconciler};
pub use session::{Session, SessionCommand, SessionEvent, SessionState};
pub use sink::{JsonFileSink, MemorySink, PersistError, RecordSink};
