//! # seqfeed
//!
//! Fetch client for sequenced binary market-data feeds.
//!
//! The server streams fixed 17-byte records back to back. The client asks for
//! everything once, notes every skipped sequence, then reconnects and asks for
//! the missing records one by one until the dataset is gap-free, and writes it
//! out as JSON.
//!
//! ## Quick Start
//!
//! ```ignore
//! use seqfeed::prelude::*;
//!
//! let report = FetchBuilder::new("127.0.0.1:3000".parse()?)
//!     .output("stockData.json")
//!     .build()
//!     .run()
//!     .await?;
//! println!("{} records", report.records.len());
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Record and request wire types
//! - [`transport`] - Frame codec, TCP client, transport traits
//! - [`client`] - Reconciler, session state machine, fetch driver, sinks

pub mod prelude;

/// Record and request wire types.
pub mod core {
    pub use seqfeed_core::*;
}

/// Frame codec, TCP client and transport traits.
pub mod transport {
    pub use seqfeed_transport::*;
}

/// Reconciler, session state machine, fetch driver and sinks.
pub mod client {
    pub use seqfeed_client::*;
}
