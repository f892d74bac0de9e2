use bytes::Bytes;

use crate::protocol::RequestHead;

/// An item produced by [`RequestDecoder`](crate::codec::RequestDecoder).
///
/// Every request yields exactly one `Header` followed by exactly one `Body`,
/// the body being empty when the request carries none.
#[derive(Debug)]
pub enum Message {
    /// The request line and header fields
    Header(RequestHead),
    /// The complete request body
    Body(Bytes),
}

impl Message {
    /// Returns true if this message contains the request head
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    /// Returns true if this message contains the request body
    #[inline]
    pub fn is_body(&self) -> bool {
        matches!(self, Message::Body(_))
    }
}

/// How the request body is framed on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Body with a `Content-Length`
    Length(u64),
    /// Body using chunked transfer encoding
    Chunked,
    /// No body
    Empty,
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty | PayloadSize::Length(0))
    }
}
