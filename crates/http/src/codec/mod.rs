//! HTTP codec module for decoding requests and encoding responses
//!
//! - [`RequestDecoder`]: yields the request head, then the fully buffered body
//! - [`ResponseEncoder`]: writes status line, header fields and body
//!
//! # Example
//!
//! ```
//! use stagemux_http::codec::RequestDecoder;
//! use stagemux_http::protocol::Message;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"POST /a HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi"[..]);
//!
//! let head = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert!(head.is_header());
//! let body = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert!(matches!(body, Message::Body(bytes) if &bytes[..] == b"hi"));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
