//! Transport traits driven by the fetch session.

use crate::error::TransportError;
use seqfeed_core::{Record, RequestFrame};
use std::future::Future;

/// Factory for connections to the record server.
///
/// The fetch session opens one connection per round and never holds two at
/// once, so implementations do not need to support concurrent connections.
pub trait Transport: Send {
    /// Connection type produced by [`Transport::connect`].
    type Connection: Connection;

    /// Opens a new connection.
    ///
    /// # Errors
    /// Returns `TransportError` if the connection cannot be established.
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// An established, framed connection.
pub trait Connection: Send {
    /// Sends one request frame.
    ///
    /// # Errors
    /// Returns `TransportError` if the write fails.
    fn send(
        &mut self,
        request: RequestFrame,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next complete record.
    ///
    /// # Returns
    /// `Ok(Some(record))` for a record, `Ok(None)` once the peer closed the stream.
    ///
    /// # Errors
    /// Returns `TransportError` on read failure or a malformed frame.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Record>, TransportError>> + Send;

    /// Closes the connection from our side.
    ///
    /// # Errors
    /// Returns `TransportError` if the shutdown fails.
    fn close(self) -> impl Future<Output = Result<(), TransportError>> + Send
    where
        Self: Sized;
}
