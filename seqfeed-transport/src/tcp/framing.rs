//! Record framing codec for TCP.
//!
//! Data frames carry no length prefix: every frame is exactly
//! [`RECORD_LENGTH`] bytes and frames are packed back to back. The read
//! buffer of [`tokio_util::codec::Framed`] carries an incomplete trailing
//! frame over to the next socket read.

use crate::error::TransportError;
use bytes::{BufMut, BytesMut};
use seqfeed_core::{RECORD_LENGTH, REQUEST_LENGTH, Record, RequestFrame};
use tokio_util::codec::{Decoder, Encoder};

/// Fixed-size record decoder and request encoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordFrameCodec {
    _private: (),
}

impl RecordFrameCodec {
    /// Creates a new record codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RecordFrameCodec {
    type Item = Record;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < RECORD_LENGTH {
            src.reserve(RECORD_LENGTH - src.len());
            return Ok(None);
        }

        let frame = src.split_to(RECORD_LENGTH);
        Ok(Some(Record::decode(&frame)?))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            None => Err(TransportError::truncated_frame(src.len())),
        }
    }
}

impl Encoder<RequestFrame> for RecordFrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: RequestFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(REQUEST_LENGTH);
        dst.put_slice(&item.encode());
        Ok(())
    }
}
