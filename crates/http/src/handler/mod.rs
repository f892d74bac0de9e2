//! The request handler invoked by [`HttpConnection`](crate::connection::HttpConnection).

use std::error::Error;

use async_trait::async_trait;

use crate::protocol::{HttpRequest, HttpResponse};

/// Error type handlers may return; it is logged and answered with a 500.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<BoxError>;

    async fn call(&self, req: HttpRequest) -> Result<HttpResponse, Self::Error>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<Err, F, Fut> Handler for HandlerFn<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Err: Into<BoxError>,
    Fut: Future<Output = Result<HttpResponse, Err>> + Send,
{
    type Error = Err;

    async fn call(&self, req: HttpRequest) -> Result<HttpResponse, Self::Error> {
        (self.f)(req).await
    }
}

pub fn make_handler<F, Err, Ret>(f: F) -> HandlerFn<F>
where
    Err: Into<BoxError>,
    Ret: Future<Output = Result<HttpResponse, Err>>,
    F: Fn(HttpRequest) -> Ret,
{
    HandlerFn { f }
}
