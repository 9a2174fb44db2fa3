//! # seqfeed Transport
//!
//! Stream transport layer for the sequenced record feed.
//!
//! This crate provides:
//! - [`Transport`] and [`Connection`] - the seam the fetch session drives
//! - [`tcp`] - TCP client with fixed-size record framing

pub mod connection;
pub mod error;
pub mod tcp;

pub use connection::{Connection, Transport};
pub use error::TransportError;
