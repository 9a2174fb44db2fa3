//! Fixed-length market-data record.
//!
//! Frame layout (17 bytes, big-endian integers, no padding):
//!
//! | offset | size | field    |
//! |--------|------|----------|
//! | 0      | 4    | symbol   |
//! | 4      | 1    | side     |
//! | 5      | 4    | quantity |
//! | 9      | 4    | price    |
//! | 13     | 4    | sequence |

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Encoded length of one record frame in bytes.
pub const RECORD_LENGTH: usize = 17;

const SYMBOL_OFFSET: usize = 0;
const SIDE_OFFSET: usize = 4;
const QUANTITY_OFFSET: usize = 5;
const PRICE_OFFSET: usize = 9;
const SEQUENCE_OFFSET: usize = 13;

/// Four-character ASCII instrument symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol([u8; 4]);

impl Symbol {
    /// Creates a symbol from raw bytes.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSymbol`] if any byte is outside 7-bit ASCII.
    /// Control bytes such as NUL padding are kept as-is.
    pub fn new(bytes: [u8; 4]) -> Result<Self> {
        if bytes.is_ascii() {
            Ok(Self(bytes))
        } else {
            Err(Error::InvalidSymbol { bytes })
        }
    }

    /// Returns the raw symbol bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Validated as ASCII on construction.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl TryFrom<&str> for Symbol {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        let bytes: [u8; 4] = value
            .as_bytes()
            .try_into()
            .map_err(|_| Error::SymbolLength {
                length: value.len(),
            })?;
        Self::new(bytes)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Symbol::try_from(value.as_str()).map_err(serde::de::Error::custom)
    }
}

/// Buy/sell indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy side, `'B'` on the wire.
    #[serde(rename = "B")]
    Buy,
    /// Sell side, `'S'` on the wire.
    #[serde(rename = "S")]
    Sell,
}

impl Side {
    /// Returns the wire byte for this side.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Buy => b'B',
            Self::Sell => b'S',
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            b'B' => Ok(Self::Buy),
            b'S' => Ok(Self::Sell),
            _ => Err(Error::InvalidSide { value }),
        }
    }
}

/// One market-data entry.
///
/// Price is a raw fixed-point integer; its scale is not known to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Buy/sell indicator.
    #[serde(rename = "buySellIndicator")]
    pub side: Side,
    /// Order quantity.
    pub quantity: u32,
    /// Fixed-point price.
    pub price: u32,
    /// Feed sequence number, 1-based.
    #[serde(rename = "packetSequence")]
    pub sequence: u32,
}

impl Record {
    /// Decodes one record from a frame of exactly [`RECORD_LENGTH`] bytes.
    ///
    /// # Errors
    /// Returns [`Error::FrameLength`] if the frame is not 17 bytes long, or a
    /// field error if the symbol or side bytes are malformed.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let frame: &[u8; RECORD_LENGTH] = frame
            .try_into()
            .map_err(|_| Error::frame_length(RECORD_LENGTH, frame.len()))?;

        let symbol = Symbol::new(read_array(frame, SYMBOL_OFFSET))?;
        let side = Side::try_from(frame[SIDE_OFFSET])?;

        Ok(Self {
            symbol,
            side,
            quantity: u32::from_be_bytes(read_array(frame, QUANTITY_OFFSET)),
            price: u32::from_be_bytes(read_array(frame, PRICE_OFFSET)),
            sequence: u32::from_be_bytes(read_array(frame, SEQUENCE_OFFSET)),
        })
    }

    /// Encodes the record into its wire frame.
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_LENGTH] {
        let mut frame = [0u8; RECORD_LENGTH];
        frame[SYMBOL_OFFSET..SIDE_OFFSET].copy_from_slice(self.symbol.as_bytes());
        frame[SIDE_OFFSET] = self.side.as_byte();
        frame[QUANTITY_OFFSET..PRICE_OFFSET].copy_from_slice(&self.quantity.to_be_bytes());
        frame[PRICE_OFFSET..SEQUENCE_OFFSET].copy_from_slice(&self.price.to_be_bytes());
        frame[SEQUENCE_OFFSET..].copy_from_slice(&self.sequence.to_be_bytes());
        frame
    }
}

#[inline(always)]
fn read_array(frame: &[u8; RECORD_LENGTH], offset: usize) -> [u8; 4] {
    [
        frame[offset],
        frame[offset + 1],
        frame[offset + 2],
        frame[offset + 3],
    ]
}
