//! The socket adapter.
//!
//! [`SocketService`] is the `stagemux-http` [`Handler`] of a socket router:
//! it turns each buffered [`HttpRequest`] into a [`CanonicalRequest`],
//! dispatches it and writes the [`CanonicalResponse`] back.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::StatusCode;
use stagemux_http::handler::Handler;
use stagemux_http::protocol::{HttpRequest, HttpResponse};
use tracing::warn;

use crate::canonical::{CanonicalRequest, CanonicalResponse};
use crate::error::{BoxError, NormalizeError};
use crate::method::Method;
use crate::router::Router;

const X_FORWARDED_FOR: &str = "X-Forwarded-For";

/// Serves a shared [`Router`] on an HTTP connection.
#[derive(Debug, Clone)]
pub struct SocketService {
    router: Arc<Router>,
}

impl SocketService {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Handler for SocketService {
    type Error = BoxError;

    async fn call(&self, req: HttpRequest) -> Result<HttpResponse, Self::Error> {
        let head_request = req.head().method() == http::Method::HEAD;

        let canonical = match normalize_request(req) {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!(cause = %e, "can't normalize request");
                return Ok(HttpResponse::new(StatusCode::NOT_IMPLEMENTED).with_body(format!("{e}\n")));
            }
        };

        let response = self.router.dispatch(canonical).await?;
        Ok(serialize_response(response, head_request))
    }
}

/// Builds the canonical request of a buffered HTTP request.
///
/// Header names keep their received case; repeated fields are joined with
/// `, `. The peer address is appended to `X-Forwarded-For` unless already
/// listed.
///
/// # Errors
///
/// `UnsupportedMethod` for methods routes can't be registered for.
pub fn normalize_request(req: HttpRequest) -> Result<CanonicalRequest, NormalizeError> {
    let (head, body, remote_addr) = req.into_parts();
    let method = Method::try_from(head.method())?;

    let mut canonical = CanonicalRequest::new(method, head.path());

    for field in head.headers() {
        canonical
            .headers
            .entry(field.name().to_owned())
            .and_modify(|value| {
                value.push_str(", ");
                value.push_str(field.value());
            })
            .or_insert_with(|| field.value().to_owned());
    }
    if let Some(remote_addr) = remote_addr {
        append_forwarded_for(&mut canonical.headers, remote_addr);
    }

    if let Some(query) = head.query() {
        canonical.query_parameters = parse_query(query);
        canonical.raw_query = query.to_owned();
    }

    if !body.is_empty() {
        canonical.body = Some(body);
    }
    Ok(canonical)
}

/// Builds the HTTP response of a canonical response. Base64 bodies are
/// decoded; a body that doesn't decode is replaced by the decoding error.
pub fn serialize_response(response: CanonicalResponse, head_request: bool) -> HttpResponse {
    let status = StatusCode::from_u16(response.status_code).unwrap_or_else(|_| {
        warn!(status = response.status_code, "handler returned an invalid status code");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let body = if response.is_base64_encoded {
        match STANDARD.decode(&response.body) {
            Ok(decoded) => Bytes::from(decoded),
            Err(e) => {
                warn!(cause = %e, "can't decode base64 response body");
                Bytes::from(format!("Error on decoding base64: {e}\n"))
            }
        }
    } else {
        Bytes::from(response.body)
    };

    let http_response = response
        .headers
        .into_iter()
        .fold(HttpResponse::new(status), |http_response, (name, value)| http_response.with_header(name, value));

    let http_response = http_response.with_body(body);
    if head_request { http_response.into_head() } else { http_response }
}

fn append_forwarded_for(headers: &mut BTreeMap<String, String>, remote_addr: SocketAddr) {
    let ip = remote_addr.ip().to_string();
    let existing = headers.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(X_FORWARDED_FOR));

    match existing {
        Some((_, value)) => {
            if !value.split(',').any(|hop| hop.trim() == ip) {
                value.push_str(", ");
                value.push_str(&ip);
            }
        }
        None => {
            headers.insert(X_FORWARDED_FOR.to_owned(), ip);
        }
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            warn!(cause = %e, query, "can't parse query string");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use http::{Uri, Version};
    use stagemux_http::protocol::{HeaderField, RequestHead};

    use super::*;
    use crate::handler::handler_fn;
    use crate::request::PathParams;

    fn request(method: http::Method, target: &str, headers: &[(&str, &str)], body: &'static [u8]) -> HttpRequest {
        let headers = headers.iter().map(|(name, value)| HeaderField::new(*name, *value)).collect();
        let head = RequestHead::new(method, target.parse::<Uri>().unwrap(), Version::HTTP_11, headers);
        HttpRequest::new(head, Bytes::from_static(body), Some("10.0.0.7:40000".parse().unwrap()))
    }

    #[test]
    fn normalizes_headers_query_and_body() {
        let req = request(
            http::Method::POST,
            "/prod/items?a=1&b=2&a=3",
            &[("Host", "localhost"), ("Accept", "text/plain"), ("Accept", "application/json"), ("X-Forwarded-For", "1.2.3.4")],
            b"{}",
        );
        let canonical = normalize_request(req).unwrap();

        assert_eq!(canonical.method, Method::Post);
        assert_eq!(canonical.path, "/prod/items");
        assert_eq!(canonical.header("accept"), Some("text/plain, application/json"));
        assert_eq!(canonical.header("x-forwarded-for"), Some("1.2.3.4, 10.0.0.7"));
        assert_eq!(canonical.query_parameters.get("a").map(String::as_str), Some("3"));
        assert_eq!(canonical.query_parameters.get("b").map(String::as_str), Some("2"));
        assert_eq!(canonical.raw_query, "a=1&b=2&a=3");
        assert_eq!(canonical.body_text(), "{}");
    }

    #[test]
    fn forwarded_for_is_not_duplicated() {
        let req = request(http::Method::GET, "/", &[("x-forwarded-for", "10.0.0.7")], b"");
        let canonical = normalize_request(req).unwrap();
        assert_eq!(canonical.header("X-Forwarded-For"), Some("10.0.0.7"));
        assert!(canonical.body.is_none());

        let req = request(http::Method::GET, "/", &[], b"");
        let canonical = normalize_request(req).unwrap();
        assert_eq!(canonical.headers.get("X-Forwarded-For").map(String::as_str), Some("10.0.0.7"));
    }

    #[test]
    fn base64_body_is_decoded() {
        let response = serialize_response(CanonicalResponse::binary(StatusCode::OK, b"\x00\x01bin"), false);
        assert_eq!(&response.body()[..], b"\x00\x01bin");

        let broken = CanonicalResponse { is_base64_encoded: true, ..CanonicalResponse::new(StatusCode::ACCEPTED) }.with_body("!!!");
        let response = serialize_response(broken, false);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(String::from_utf8_lossy(response.body()).starts_with("Error on decoding base64: "));
    }

    #[test]
    fn invalid_status_and_head() {
        let response = serialize_response(CanonicalResponse { status_code: 42, ..CanonicalResponse::ok("x") }, false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = serialize_response(CanonicalResponse::ok("hidden").with_header("X-A", "1"), true);
        assert!(response.body().is_empty());
        assert_eq!(response.content_length(), 6);
        assert_eq!(response.header("x-a"), Some("1"));
    }

    #[tokio::test]
    async fn unknown_method_is_not_implemented() {
        let service = SocketService::new(Arc::new(Router::builder().build()));
        let method = http::Method::from_bytes(b"PURGE").unwrap();
        let response = service.call(request(method, "/prod/a", &[], b"")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn dispatches_to_route() {
        let mut router = Router::builder().build();
        router
            .routes()
            .get("/hello/:name", handler_fn(|req: CanonicalRequest, params: PathParams| async move {
                let body = format!("hello {} from {}", params.get("name").unwrap_or_default(), req.stage);
                Ok::<_, BoxError>(CanonicalResponse::ok(body))
            }))
            .unwrap();

        let service = SocketService::new(Arc::new(router));
        let response = service.call(request(http::Method::GET, "/prod/hello/ferris", &[], b"")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"hello ferris from prod");
    }
}
