//! HTTP request decoder module
//!
//! The decoder works in two phases, driven by whether a body decoder is
//! currently installed:
//!
//! 1. Header parsing through [`HeaderDecoder`]
//! 2. Body buffering through [`BodyDecoder`], selected from the head's
//!    `Content-Length` / `Transfer-Encoding`

use crate::codec::body::BodyDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for HTTP requests that yields a [`Message::Header`] followed by
/// a [`Message::Body`] for every request on the connection.
///
/// # State Machine
///
/// - `body_decoder == None`: currently parsing a head
/// - `body_decoder == Some(_)`: currently buffering that request's body
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    body_decoder: Option<BodyDecoder>,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, body_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message;
    type Error = ParseError;

    /// Attempts to decode the next message from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: a request head was decoded
    /// - `Ok(Some(Message::Body(_)))`: the complete body of that request
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the request is malformed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(body_decoder) = &mut self.body_decoder {
            return match body_decoder.decode(src)? {
                Some(bytes) => {
                    // the next bytes belong to the next request
                    self.body_decoder.take();
                    Ok(Some(Message::Body(bytes)))
                }
                None => Ok(None),
            };
        }

        match self.header_decoder.decode(src)? {
            Some(head) => {
                self.body_decoder = Some(head.payload_size()?.into());
                Ok(Some(Message::Header(head)))
            }
            None => Ok(None),
        }
    }
}
