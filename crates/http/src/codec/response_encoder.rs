//! HTTP response encoder
//!
//! Serializes an [`HttpResponse`] into raw bytes: the HTTP/1.1 status line,
//! every header field in insertion order and with its original case, a
//! `Content-Length` computed from the body, then the body itself. A `HEAD`
//! answer declares the length of the body it doesn't send.

use crate::protocol::{HttpResponse, SendError};

use bytes::{BufMut, BytesMut};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::warn;

/// Initial buffer size allocated for head serialization
const INIT_HEAD_SIZE: usize = 4 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<HttpResponse> for ResponseEncoder {
    type Error = SendError;

    /// Encodes the whole response into `dst`.
    ///
    /// Header fields whose name or value contains CR or LF are dropped with a
    /// warning, since writing them would split the response. Any
    /// `Content-Length` set by the handler is replaced.
    fn encode(&mut self, item: HttpResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let content_length = item.content_length();
        let (status, headers, body) = item.into_parts();

        dst.reserve(INIT_HEAD_SIZE + body.len());
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or_default())?;

        for field in &headers {
            if field.name().eq_ignore_ascii_case("content-length") {
                continue;
            }
            if has_line_break(field.name()) || has_line_break(field.value()) {
                warn!(header = field.name(), "skip header field containing a line break");
                continue;
            }
            dst.put_slice(field.name().as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(field.value().as_bytes());
            dst.put_slice(b"\r\n");
        }

        write!(FastWrite(dst), "Content-Length: {content_length}\r\n\r\n")?;
        dst.put_slice(&body);
        Ok(())
    }
}

fn has_line_break(str: &str) -> bool {
    str.bytes().any(|b| b == b'\r' || b == b'\n')
}

/// Writes formatted output straight into the reserved `BytesMut`.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn encode(response: HttpResponse) -> String {
        let mut dst = BytesMut::new();
        ResponseEncoder.encode(response, &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn writes_status_headers_and_body() {
        let response = HttpResponse::new(StatusCode::OK).with_header("X-Request-Id", "abc").with_body("hello");
        assert_eq!(encode(response), "HTTP/1.1 200 OK\r\nX-Request-Id: abc\r\nContent-Length: 5\r\n\r\nhello");
    }

    #[test]
    fn replaces_content_length_and_drops_line_breaks() {
        let response = HttpResponse::new(StatusCode::NOT_FOUND)
            .with_header("content-length", "100")
            .with_header("X-Bad", "a\r\nInjected: yes");
        assert_eq!(encode(response), "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn head_response_keeps_content_length() {
        let response = HttpResponse::new(StatusCode::OK).with_body("hello").into_head();
        assert!(response.body().is_empty());
        assert_eq!(encode(response), "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n");
    }
}
