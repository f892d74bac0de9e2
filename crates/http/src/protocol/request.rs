//! Request head and buffered request types.
//!
//! Header names are stored exactly as the client sent them. Lookups through
//! [`RequestHead::header`] are case-insensitive, as HTTP requires.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{Method, Uri, Version};

use crate::protocol::{ParseError, PayloadSize};

/// One header field as received on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    value: String,
}

impl HeaderField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// The request line and header fields of an HTTP request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    version: Version,
    headers: Vec<HeaderField>,
}

impl RequestHead {
    pub fn new(method: Method, uri: Uri, version: Version, headers: Vec<HeaderField>) -> Self {
        Self { method, uri, version, headers }
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path part of the request target, without the query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns all header fields in the order they were received.
    pub fn headers(&self) -> &[HeaderField] {
        &self.headers
    }

    /// Returns the value of the first header field named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|field| field.name.eq_ignore_ascii_case(name)).map(HeaderField::value)
    }

    /// Whether the connection stays open after this request has been answered.
    pub fn keep_alive(&self) -> bool {
        let connection = self.header("connection").map(str::to_ascii_lowercase);
        match self.version {
            Version::HTTP_10 => connection.is_some_and(|value| value.contains("keep-alive")),
            _ => !connection.is_some_and(|value| value.contains("close")),
        }
    }

    /// Whether the client waits for `100 Continue` before sending the body.
    pub fn expects_continue(&self) -> bool {
        self.header("expect").is_some_and(|value| value.len() >= 4 && value.as_bytes()[..4].eq_ignore_ascii_case(b"100-"))
    }

    /// Determines how the body is framed, according to RFC 9112 section 6.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if both `Content-Length` and `Transfer-Encoding`
    /// are present, or `Content-Length` is not a number.
    pub fn payload_size(&self) -> Result<PayloadSize, ParseError> {
        let te_header = self.header("transfer-encoding");
        let cl_header = self.header("content-length");

        match (te_header, cl_header) {
            (None, None) => Ok(PayloadSize::Empty),

            (Some(te_value), None) => {
                let chunked = te_value.rsplit(',').next().is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"));
                if chunked { Ok(PayloadSize::Chunked) } else { Ok(PayloadSize::Empty) }
            }

            (None, Some(cl_value)) => {
                let length = cl_value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ParseError::invalid_content_length(format!("value {cl_value} is not u64")))?;
                Ok(PayloadSize::Length(length))
            }

            (Some(_), Some(_)) => {
                Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
            }
        }
    }
}

impl TryFrom<&httparse::Request<'_, '_>> for RequestHead {
    type Error = ParseError;

    fn try_from(req: &httparse::Request<'_, '_>) -> Result<Self, Self::Error> {
        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            // http2 and http3 currently not support
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let headers = req
            .headers
            .iter()
            .map(|header| HeaderField::new(header.name, String::from_utf8_lossy(header.value)))
            .collect();

        Ok(RequestHead { method, uri, version, headers })
    }
}

/// A complete request: head, buffered body and the address of the peer.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    head: RequestHead,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl HttpRequest {
    pub fn new(head: RequestHead, body: Bytes, remote_addr: Option<SocketAddr>) -> Self {
        Self { head, body, remote_addr }
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn into_parts(self) -> (RequestHead, Bytes, Option<SocketAddr>) {
        (self.head, self.body, self.remote_addr)
    }
}

#[cfg(test)]
mod tests {
    use std::mem::MaybeUninit;

    use indoc::indoc;

    use super::*;

    fn parse(str: &str) -> RequestHead {
        let mut parsed_req = httparse::Request::new(&mut []);
        let mut headers: [MaybeUninit<httparse::Header>; 8] = [const { MaybeUninit::uninit() }; 8];
        parsed_req.parse_with_uninit_headers(str.as_bytes(), &mut headers).unwrap();
        RequestHead::try_from(&parsed_req).unwrap()
    }

    #[test]
    fn from_curl() {
        let head = parse(indoc! {r##"
        GET /index.html?a=1 HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        X-Custom-Header: Some Value

        "##});

        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.path(), "/index.html");
        assert_eq!(head.query(), Some("a=1"));
        assert_eq!(head.headers().len(), 3);
        assert_eq!(head.headers()[2].name(), "X-Custom-Header");
        assert_eq!(head.header("x-custom-header"), Some("Some Value"));
        assert!(head.keep_alive());
        assert_eq!(head.payload_size().unwrap(), PayloadSize::Empty);
    }

    #[test]
    fn http_10_closes_by_default() {
        let head = parse("GET / HTTP/1.0\r\nHost: a\r\n\r\n");
        assert!(!head.keep_alive());

        let head = parse("GET / HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n");
        assert!(head.keep_alive());
    }

    #[test]
    fn payload_size_from_headers() {
        let head = parse("POST / HTTP/1.1\r\nContent-Length: 12\r\n\r\n");
        assert_eq!(head.payload_size().unwrap(), PayloadSize::Length(12));

        let head = parse("POST / HTTP/1.1\r\nTransfer-Encoding: gzip, chunked\r\n\r\n");
        assert_eq!(head.payload_size().unwrap(), PayloadSize::Chunked);

        let head = parse("POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\n");
        assert!(head.payload_size().is_err());

        let head = parse("POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n");
        assert!(head.payload_size().is_err());
    }

    #[test]
    fn expect_continue() {
        let head = parse("POST / HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 1\r\n\r\n");
        assert!(head.expects_continue());
    }
}
