//! Prelude module for convenient imports.
//!
//! ```ignore
//! use seqfeed::prelude::*;
//! ```

// Wire types
pub use seqfeed_core::{
    Error as CoreError, RECORD_LENGTH, Record, RequestFrame, RequestType, Side, Symbol,
};

// Transport types
pub use seqfeed_transport::tcp::{RecordFrameCodec, TcpClient, TcpClientConfig, TcpTransport};
pub use seqfeed_transport::{Connection, Transport, TransportError};

// Client types
pub use seqfeed_client::{
    BackoffConfig, ClientError, FetchBuilder, FetchConfig, FetchReport, Fetcher, JsonFileSink,
    MemorySink, RecordSink, SequenceReconciler, Session, SessionCommand, SessionEvent,
};
