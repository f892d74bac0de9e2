//! Handler traits and the adapters turning async functions into handlers.
//!
//! Routes accept any [`RequestHandler`]. Two function shapes are supported:
//!
//! - [`handler_fn`]: `async fn(CanonicalRequest, PathParams)`, path
//!   parameters passed explicitly
//! - [`context_fn`]: `async fn(RequestContext, CanonicalRequest)`, path
//!   parameters carried by the request context

use async_trait::async_trait;

use crate::canonical::{CanonicalRequest, CanonicalResponse};
use crate::error::BoxError;
use crate::request::RequestContext;
use crate::PathParams;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: RequestContext, req: CanonicalRequest) -> Result<CanonicalResponse, BoxError>;
}

/// A handler built from `Fn(CanonicalRequest, PathParams)`.
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut, E>(f: F) -> FnHandler<F>
where
    F: Fn(CanonicalRequest, PathParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CanonicalResponse, E>> + Send,
    E: Into<BoxError>,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut, E> RequestHandler for FnHandler<F>
where
    F: Fn(CanonicalRequest, PathParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CanonicalResponse, E>> + Send,
    E: Into<BoxError>,
{
    async fn invoke(&self, ctx: RequestContext, req: CanonicalRequest) -> Result<CanonicalResponse, BoxError> {
        let params = ctx.path_params().clone();
        (self.f)(req, params).await.map_err(Into::into)
    }
}

/// A handler built from `Fn(RequestContext, CanonicalRequest)`.
#[derive(Debug)]
pub struct ContextFnHandler<F> {
    f: F,
}

pub fn context_fn<F, Fut, E>(f: F) -> ContextFnHandler<F>
where
    F: Fn(RequestContext, CanonicalRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CanonicalResponse, E>> + Send,
    E: Into<BoxError>,
{
    ContextFnHandler { f }
}

#[async_trait]
impl<F, Fut, E> RequestHandler for ContextFnHandler<F>
where
    F: Fn(RequestContext, CanonicalRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CanonicalResponse, E>> + Send,
    E: Into<BoxError>,
{
    async fn invoke(&self, ctx: RequestContext, req: CanonicalRequest) -> Result<CanonicalResponse, BoxError> {
        (self.f)(ctx, req).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use std::collections::BTreeMap;

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    #[tokio::test]
    async fn explicit_surface_receives_params() {
        async fn hello(_req: CanonicalRequest, params: PathParams) -> Result<CanonicalResponse, BoxError> {
            Ok(CanonicalResponse::ok(format!("hello {}", params.get("name").unwrap_or_default())))
        }

        let handler = handler_fn(hello);
        assert_is_handler(&handler);

        let params = PathParams::from(BTreeMap::from([("name".to_owned(), "ferris".to_owned())]));
        let response = handler.invoke(RequestContext::new(params, "prod"), CanonicalRequest::new(Method::Get, "/")).await.unwrap();
        assert_eq!(response.body, "hello ferris");
    }

    #[tokio::test]
    async fn context_surface_receives_context() {
        let handler = context_fn(|ctx: RequestContext, req: CanonicalRequest| async move {
            Ok::<_, BoxError>(CanonicalResponse::ok(format!("{} {}", ctx.stage(), req.path)))
        });
        assert_is_handler(&handler);

        let response = handler.invoke(RequestContext::new(PathParams::empty(), "dev"), CanonicalRequest::new(Method::Get, "/x")).await.unwrap();
        assert_eq!(response.body, "dev /x");
    }
}
