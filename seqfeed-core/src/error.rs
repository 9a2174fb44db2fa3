//! Error types for seqfeed wire operations.

use thiserror::Error;

/// Core error type for record and request encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Frame does not have the fixed wire length.
    #[error("invalid frame length: expected {expected} bytes, got {actual} bytes")]
    FrameLength {
        /// Required frame size in bytes.
        expected: usize,
        /// Actual frame size in bytes.
        actual: usize,
    },

    /// Symbol bytes are not ASCII.
    #[error("invalid symbol bytes {bytes:?}")]
    InvalidSymbol {
        /// Raw symbol bytes.
        bytes: [u8; 4],
    },

    /// Symbol text is not exactly four bytes.
    #[error("symbol must be 4 bytes, got {length}")]
    SymbolLength {
        /// Length of the rejected text.
        length: usize,
    },

    /// Side indicator is neither buy nor sell.
    #[error("invalid side indicator 0x{value:02x}")]
    InvalidSide {
        /// Raw indicator byte.
        value: u8,
    },

    /// Unknown request type byte.
    #[error("invalid request type {value}")]
    InvalidRequestType {
        /// Raw request type byte.
        value: u8,
    },

    /// Sequence number does not fit in the one-byte request field.
    #[error("sequence {sequence} exceeds recovery request maximum {max}")]
    SequenceOutOfRange {
        /// Requested sequence number.
        sequence: u32,
        /// Largest encodable sequence number.
        max: u32,
    },
}

impl Error {
    /// Creates a frame length error.
    pub fn frame_length(expected: usize, actual: usize) -> Self {
        Self::FrameLength { expected, actual }
    }
}

/// Result type alias for seqfeed core operations.
pub type Result<T> = std::result::Result<T, Error>;
