//! The socket transport of stagemux: a small asynchronous HTTP/1.1 server.
//!
//! Unlike a general purpose server, every request body is buffered completely
//! before the handler runs. The router on top of this crate needs the whole
//! request (headers, query and body) to build its canonical request, so there
//! is nothing to gain from streaming here.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//! use stagemux_http::connection::HttpConnection;
//! use stagemux_http::handler::make_handler;
//! use stagemux_http::protocol::{HttpRequest, HttpResponse};
//! use std::error::Error;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = Arc::clone(&handler);
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer, Some(remote_addr));
//!             if let Err(e) = connection.process(handler).await {
//!                 error!("service has error, cause {}, connection shutdown", e);
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: HttpRequest) -> Result<HttpResponse, Box<dyn Error + Send + Sync>> {
//!     info!(path = request.head().path(), "request received");
//!     Ok(HttpResponse::new(http::StatusCode::OK).with_body("Hello World!\r\n"))
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: the per-connection request loop
//! - [`protocol`]: request/response types and errors
//! - [`codec`]: the `tokio-util` decoder and encoder
//! - [`handler`]: the request handler trait
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - No TLS support (use a reverse proxy for HTTPS)
//! - Maximum header size: 8KB, maximum number of headers: 64
//! - Maximum request body: 6MB

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
