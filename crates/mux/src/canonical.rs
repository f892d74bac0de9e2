//! The transport independent request and response.
//!
//! Both transports normalize into [`CanonicalRequest`] and serialize from
//! [`CanonicalResponse`], so routing and handlers see the same values
//! whether a request came from a socket or from an invocation event. Every
//! map is a `BTreeMap`, which keeps serialized forms deterministic.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::method::Method;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRequest {
    pub method: Method,
    /// Raw request path, query string stripped
    pub path: String,
    /// The route template the host matched, the path itself behind a socket
    pub resource: String,
    pub headers: BTreeMap<String, String>,
    /// Last value wins on duplicate keys
    pub query_parameters: BTreeMap<String, String>,
    /// The query string as received, without the `?`
    #[serde(default)]
    pub raw_query: String,
    pub path_parameters: BTreeMap<String, String>,
    pub stage: String,
    pub stage_variables: BTreeMap<String, String>,
    pub authorizer_context: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    pub body: Option<Bytes>,
}

impl CanonicalRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method,
            resource: path.clone(),
            path,
            headers: BTreeMap::new(),
            query_parameters: BTreeMap::new(),
            raw_query: String::new(),
            path_parameters: BTreeMap::new(),
            stage: String::new(),
            stage_variables: BTreeMap::new(),
            authorizer_context: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a query parameter, appending it to the raw query too.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        if let Ok(pair) = serde_urlencoded::to_string([(&name, &value)]) {
            if !self.raw_query.is_empty() {
                self.raw_query.push('&');
            }
            self.raw_query.push_str(&pair);
        }
        self.query_parameters.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the value of the first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    /// The body as text, lossily decoded; empty when there is no body.
    pub fn body_text(&self) -> String {
        self.body.as_deref().map(String::from_utf8_lossy).unwrap_or_default().into_owned()
    }
}

/// A response as handlers produce it.
///
/// Binary bodies travel base64-encoded with `is_base64_encoded` set; the
/// socket transport decodes them before writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl CanonicalResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status_code: status.as_u16(), headers: BTreeMap::new(), body: String::new(), is_base64_encoded: false }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// A response whose body is the given JSON text.
    pub fn json(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status).with_header("Content-Type", mime::APPLICATION_JSON.as_ref()).with_body(body)
    }

    /// A response carrying raw bytes, stored base64-encoded.
    pub fn binary(status: StatusCode, bytes: impl AsRef<[u8]>) -> Self {
        Self { is_base64_encoded: true, ..Self::new(status) }.with_body(STANDARD.encode(bytes))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }
}
