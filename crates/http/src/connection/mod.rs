//! HTTP connection handling
//!
//! [`HttpConnection`] drives one client connection: it decodes a request head,
//! answers `Expect: 100-continue`, buffers the body, calls the
//! [`Handler`](crate::handler::Handler) and writes the response, repeating
//! while the client keeps the connection alive.

mod http_connection;

pub use http_connection::HttpConnection;
