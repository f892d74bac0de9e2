//! The invocation adapter.
//!
//! Each call arrives as an API-gateway proxy event and is answered with the
//! JSON form of a [`CanonicalResponse`]. Events are processed one at a time.
//! In authorizer-only mode the events are authorizer requests, answered by
//! the router's [`Authorizer`](crate::Authorizer) alone.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tracing::{debug, error, info, warn};

use crate::auth::AuthorizerRequest;
use crate::canonical::CanonicalRequest;
use crate::config::TransportMode;
use crate::error::{InvocationError, NormalizeError};
use crate::method::Method;
use crate::router::Router;
use crate::transport::template::render_resource;

/// Where invocation events come from and where answers go.
#[async_trait]
pub trait InvocationHost: Send {
    /// The next event, `None` once the host has no more.
    async fn next_event(&mut self) -> Result<Option<Value>, InvocationError>;

    async fn respond(&mut self, response: Value) -> Result<(), InvocationError>;

    /// Reports that the current event failed.
    async fn fail(&mut self, error_type: &str, message: &str) -> Result<(), InvocationError>;
}

/// A host speaking JSON lines: one event per input line, one answer per
/// output line. Failures are written as `{"errorMessage", "errorType"}`.
#[derive(Debug)]
pub struct StdioHost<R, W> {
    lines: Lines<BufReader<R>>,
    writer: W,
}

impl<R, W> StdioHost<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { lines: BufReader::new(reader).lines(), writer }
    }

    async fn write_line(&mut self, value: &Value) -> Result<(), InvocationError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

impl StdioHost<Stdin, Stdout> {
    /// The host of the running process: stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> InvocationHost for StdioHost<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_event(&mut self) -> Result<Option<Value>, InvocationError> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(&line)?));
        }
        Ok(None)
    }

    async fn respond(&mut self, response: Value) -> Result<(), InvocationError> {
        self.write_line(&response).await
    }

    async fn fail(&mut self, error_type: &str, message: &str) -> Result<(), InvocationError> {
        self.write_line(&json!({ "errorMessage": message, "errorType": error_type })).await
    }
}

/// An API-gateway proxy event. Gateways send `null` for empty maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyRequestEvent {
    pub http_method: String,
    pub path: String,
    pub resource: String,
    pub headers: Option<BTreeMap<String, String>>,
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    pub path_parameters: Option<BTreeMap<String, String>>,
    pub stage_variables: Option<BTreeMap<String, String>>,
    pub request_context: ProxyRequestContext,
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyRequestContext {
    pub stage: String,
    pub authorizer: Option<BTreeMap<String, Value>>,
}

/// Builds the canonical request of a proxy event.
///
/// The path is the event's resource rendered with its path parameters, or
/// the event's literal path when the resource doesn't render.
///
/// # Errors
///
/// `UnsupportedMethod` for an unknown method, `InvalidEvent` for a body
/// flagged base64 that doesn't decode.
pub fn normalize_event(event: ProxyRequestEvent) -> Result<CanonicalRequest, NormalizeError> {
    let method: Method = event.http_method.parse()?;
    let path_parameters = event.path_parameters.unwrap_or_default();

    let path = if event.resource.is_empty() {
        event.path.clone()
    } else {
        render_resource(&event.resource, &path_parameters).unwrap_or_else(|e| {
            debug!(cause = %e, resource = %event.resource, "render resource failed, use the event path");
            event.path.clone()
        })
    };

    let body = match event.body {
        Some(body) if event.is_base64_encoded => {
            Some(Bytes::from(STANDARD.decode(body).map_err(|e| NormalizeError::invalid_event(format!("body is not base64: {e}")))?))
        }
        Some(body) => Some(Bytes::from(body)),
        None => None,
    };

    let mut req = CanonicalRequest::new(method, path);
    if !event.resource.is_empty() {
        req.resource = event.resource;
    }
    req.headers = event.headers.unwrap_or_default();
    req.query_parameters = event.query_string_parameters.unwrap_or_default();
    req.raw_query = serde_urlencoded::to_string(&req.query_parameters).unwrap_or_default();
    req.path_parameters = path_parameters;
    req.stage = event.request_context.stage;
    req.stage_variables = event.stage_variables.unwrap_or_default();
    req.authorizer_context = event.request_context.authorizer.unwrap_or_default();
    req.body = body.filter(|body| !body.is_empty());
    Ok(req)
}

/// Answers events from `host` until it has none left.
pub(crate) async fn run<H: InvocationHost>(router: &Router, host: &mut H) -> Result<(), InvocationError> {
    let authorizer_only = matches!(router.config().transport, TransportMode::Invocation { authorizer_only: true });
    info!(authorizer_only, "start processing invocation events");

    loop {
        let event = match host.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(InvocationError::Json { source }) => {
                warn!(cause = %source, "malformed invocation event");
                host.fail("InvalidEvent", &source.to_string()).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        if authorizer_only {
            answer_authorizer_event(router, host, event).await?;
        } else {
            answer_proxy_event(router, host, event).await?;
        }
    }

    info!("invocation host has no more events");
    Ok(())
}

async fn answer_proxy_event<H: InvocationHost>(router: &Router, host: &mut H, event: Value) -> Result<(), InvocationError> {
    let req = match serde_json::from_value::<ProxyRequestEvent>(event) {
        Ok(event) => normalize_event(event),
        Err(e) => Err(NormalizeError::invalid_event(e)),
    };
    let req = match req {
        Ok(req) => req,
        Err(e) => {
            warn!(cause = %e, "can't normalize invocation event");
            let error_type = match e {
                NormalizeError::UnsupportedMethod { .. } => "UnsupportedMethod",
                NormalizeError::InvalidEvent { .. } => "InvalidEvent",
            };
            return host.fail(error_type, &e.to_string()).await;
        }
    };

    match router.dispatch(req).await {
        Ok(response) => host.respond(serde_json::to_value(&response)?).await,
        Err(e) => {
            error!(cause = %e, "handler failed");
            host.fail("HandlerError", &e.to_string()).await
        }
    }
}

async fn answer_authorizer_event<H: InvocationHost>(router: &Router, host: &mut H, event: Value) -> Result<(), InvocationError> {
    let Some(authorizer) = router.authorizer() else {
        error!("authorizer-only mode without an authorizer");
        return host.fail("NoAuthorizer", "no authorizer configured").await;
    };

    let request = match serde_json::from_value::<AuthorizerRequest>(event) {
        Ok(request) => request,
        Err(e) => {
            warn!(cause = %e, "malformed authorizer event");
            return host.fail("InvalidEvent", &e.to_string()).await;
        }
    };

    match authorizer.authorize(request).await {
        Ok(response) => host.respond(serde_json::to_value(&response)?).await,
        Err(e) => {
            warn!(cause = %e, "authorizer failed");
            host.fail("Unauthorized", &e.to_string()).await
        }
    }
}
