//! HTTP header decoder implementation for parsing HTTP request heads
//!
//! Parsing is delegated to `httparse`; the parsed request line and header
//! fields are then copied into an owned [`RequestHead`], keeping each header
//! name in the case it was received.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1

use std::mem::MaybeUninit;

use bytes::{Buf, BytesMut};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, RequestHead};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Below this size a buffer can't hold a complete head, even with bare `\n` line endings
const MIN_HEAD_BYTES: usize = 14;

/// Decoder for HTTP request heads implementing the [`Decoder`] trait.
#[derive(Debug, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = RequestHead;
    type Error = ParseError;

    /// Attempts to decode a request head from the provided bytes buffer.
    ///
    /// On success the head bytes are removed from `src`, leaving the body (or
    /// the next request) at the front of the buffer.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - The number of headers exceeds `MAX_HEADER_NUM`
    /// - The head size exceeds `MAX_HEADER_BYTES`
    /// - The HTTP version, method or request target is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_HEAD_BYTES {
            return Ok(None);
        }

        let mut req = httparse::Request::new(&mut []);
        let mut headers: [MaybeUninit<httparse::Header>; MAX_HEADER_NUM] = [const { MaybeUninit::uninit() }; MAX_HEADER_NUM];

        let parsed_result = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(head_size = body_offset, "parsed request head");
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let head = RequestHead::try_from(&req)?;
                src.advance(body_offset);
                Ok(Some(head))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}
