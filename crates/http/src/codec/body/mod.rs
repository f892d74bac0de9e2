//! Request body buffering.
//!
//! - [`BodyDecoder`]: selects the strategy from [`PayloadSize`](crate::protocol::PayloadSize)
//! - `LengthDecoder`: `Content-Length` bodies
//! - `ChunkedDecoder`: chunked transfer encoding (RFC 9112 section 7.1)
//!
//! Every decoder accumulates the whole body and yields it once, as a single
//! `Bytes`. Bodies larger than [`MAX_BODY_BYTES`] are rejected.

mod body_decoder;
mod chunked_decoder;
mod length_decoder;

pub use body_decoder::BodyDecoder;

/// Maximum size in bytes of a buffered request body
pub const MAX_BODY_BYTES: u64 = 6 * 1024 * 1024;
