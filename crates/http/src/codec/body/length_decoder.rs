//! Decoder for bodies framed by a `Content-Length` header.

use crate::codec::body::MAX_BODY_BYTES;
use crate::ensure;
use crate::protocol::ParseError;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Waits until `length` bytes are available, then yields them at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl Decoder for LengthDecoder {
    type Item = Bytes;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        ensure!(self.length <= MAX_BODY_BYTES, ParseError::too_large_body(self.length, MAX_BODY_BYTES));

        // bounded by MAX_BODY_BYTES above, so it fits in usize
        let length = usize::try_from(self.length).map_err(|_| ParseError::too_large_body(self.length, MAX_BODY_BYTES))?;
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(length).freeze()))
    }
}
