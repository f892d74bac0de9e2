//! Request head decoding.
//!
//! - [`HeaderDecoder`]: parses the request line and header fields with
//!   `httparse`, enforcing the header count and size limits

mod header_decoder;

pub use header_decoder::HeaderDecoder;
