//! Error types for transport operations.

use thiserror::Error;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection timeout.
    #[error("connection timeout")]
    ConnectTimeout,

    /// A received frame could not be decoded.
    #[error("malformed frame: {0}")]
    Format(#[from] seqfeed_core::Error),

    /// The peer closed the stream in the middle of a frame.
    #[error("stream closed with {remaining} bytes of an incomplete frame")]
    TruncatedFrame {
        /// Bytes left in the read buffer.
        remaining: usize,
    },
}

impl TransportError {
    /// Creates a truncated frame error.
    pub fn truncated_frame(remaining: usize) -> Self {
        Self::TruncatedFrame { remaining }
    }

    /// Returns true if the error was caused by undecodable peer data rather
    /// than by the connection itself.
    #[must_use]
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_) | Self::TruncatedFrame { .. })
    }
}
