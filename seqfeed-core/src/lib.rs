//! # seqfeed Core
//!
//! Wire types for the sequenced market-data feed.
//!
//! This crate provides:
//! - [`Record`] decoding and encoding of the fixed 17-byte data frame
//! - [`RequestFrame`] encoding of the 2-byte client request
//! - Error types for malformed frames and unencodable requests
//!
//! Everything here is pure: no I/O, no allocation on the decode path.

pub mod error;
pub mod record;
pub mod request;

pub use error::{Error, Result};
pub use record::{RECORD_LENGTH, Record, Side, Symbol};
pub use request::{REQUEST_LENGTH, RequestFrame, RequestType};
