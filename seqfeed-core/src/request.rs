//! Client request frames.
//!
//! Frame format: `[request type][sequence]`, one byte each.

use crate::error::{Error, Result};

/// Encoded length of a request frame in bytes.
pub const REQUEST_LENGTH: usize = 2;

/// Kind of records requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestType {
    /// Stream every record, then close.
    All = 1,
    /// Resend the single record carrying the given sequence.
    One = 2,
}

impl TryFrom<u8> for RequestType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::All),
            2 => Ok(Self::One),
            _ => Err(Error::InvalidRequestType { value }),
        }
    }
}

/// A 2-byte request sent from client to server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestFrame {
    kind: RequestType,
    sequence: u8,
}

impl RequestFrame {
    /// Largest sequence number a recovery request can carry.
    pub const MAX_SEQUENCE: u32 = u8::MAX as u32;

    /// Creates a request for the full record stream.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            kind: RequestType::All,
            sequence: 0,
        }
    }

    /// Creates a request for a single record.
    ///
    /// # Errors
    /// Returns [`Error::SequenceOutOfRange`] if `sequence` does not fit the
    /// one-byte wire field.
    pub fn one(sequence: u32) -> Result<Self> {
        let sequence = u8::try_from(sequence).map_err(|_| Error::SequenceOutOfRange {
            sequence,
            max: Self::MAX_SEQUENCE,
        })?;
        Ok(Self {
            kind: RequestType::One,
            sequence,
        })
    }

    /// Returns the request type.
    #[must_use]
    pub fn kind(&self) -> RequestType {
        self.kind
    }

    /// Returns the requested sequence (0 for [`RequestType::All`]).
    #[must_use]
    pub fn sequence(&self) -> u32 {
        u32::from(self.sequence)
    }

    /// Encodes the request into its wire frame.
    #[must_use]
    pub fn encode(&self) -> [u8; REQUEST_LENGTH] {
        [self.kind as u8, self.sequence]
    }

    /// Decodes a request frame.
    ///
    /// # Errors
    /// Returns an error if the frame is not 2 bytes or the type is unknown.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let [kind, sequence]: [u8; REQUEST_LENGTH] = frame
            .try_into()
            .map_err(|_| Error::frame_length(REQUEST_LENGTH, frame.len()))?;
        Ok(Self {
            kind: RequestType::try_from(kind)?,
            sequence,
        })
    }
}
