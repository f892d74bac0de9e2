//! HTTP response representation.
//!
//! The encoder always writes `Content-Length`, so handlers never need to set
//! it themselves; any value they set is overwritten. A response to `HEAD`
//! keeps the length of the body it would have sent.

use bytes::Bytes;
use http::StatusCode;

use crate::protocol::HeaderField;

/// A complete response: status, header fields in insertion order, and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: StatusCode,
    headers: Vec<HeaderField>,
    body: Bytes,
    /// Declared length of a body that isn't sent
    head_length: Option<u64>,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: Vec::new(), body: Bytes::new(), head_length: None }
    }

    /// Appends a header field.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderField::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.head_length = None;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[HeaderField] {
        &self.headers
    }

    /// Returns the value of the first header field named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|field| field.name().eq_ignore_ascii_case(name)).map(HeaderField::value)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Drops the body for a `HEAD` answer, keeping its length as `Content-Length`.
    pub fn into_head(self) -> Self {
        let head_length = self.content_length();
        Self { body: Bytes::new(), head_length: Some(head_length), ..self }
    }

    /// The `Content-Length` the encoder writes.
    pub fn content_length(&self) -> u64 {
        self.head_length.unwrap_or(self.body.len() as u64)
    }

    pub fn into_parts(self) -> (StatusCode, Vec<HeaderField>, Bytes) {
        (self.status, self.headers, self.body)
    }
}
