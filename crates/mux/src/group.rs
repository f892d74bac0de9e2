//! Route registration with composable prefixes.
//!
//! A [`Group`] writes routes into a [`RouteSink`] (the router's own trie, or
//! a [`Registrar`](crate::router::Registrar) while serving), prefixing every
//! pattern with its own prefix. Nested groups concatenate prefixes.
//!
//! ```
//! use stagemux::{BoxError, CanonicalRequest, CanonicalResponse, PathParams, Router, handler_fn};
//!
//! async fn user(_req: CanonicalRequest, params: PathParams) -> Result<CanonicalResponse, BoxError> {
//!     Ok(CanonicalResponse::ok(format!("user {}", params.get("id").unwrap_or_default())))
//! }
//!
//! # fn main() -> Result<(), stagemux::RouteError> {
//! let mut router = Router::builder().build();
//! let mut routes = router.routes();
//! let mut api = routes.group("/api/v1/")?;
//! api.get("/users/:id", handler_fn(user))?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::canonical::{CanonicalRequest, CanonicalResponse};
use crate::error::{BoxError, RouteError};
use crate::handler::{RequestHandler, context_fn};
use crate::method::Method;
use crate::request::RequestContext;
use crate::router::RouteSink;

#[derive(Debug)]
pub struct Group<'s, S> {
    sink: &'s mut S,
    prefix: String,
}

/// The context surface of a [`Group`]: handlers are plain async functions of
/// `(RequestContext, CanonicalRequest)`.
#[derive(Debug)]
pub struct ContextGroup<'s, S> {
    group: Group<'s, S>,
}

macro_rules! method_routes {
    ($($name:ident => $method:expr),* $(,)?) => {
        $(
            #[doc = concat!("Registers a handler for `", stringify!($name), "` requests.")]
            ///
            /// # Errors
            ///
            /// Returns the [`RouteError`] of the insertion.
            pub fn $name(&mut self, pattern: &str, handler: impl RequestHandler + 'static) -> Result<&mut Self, RouteError> {
                self.handle($method, pattern, handler)
            }
        )*
    };
}

macro_rules! context_routes {
    ($($name:ident => $method:expr),* $(,)?) => {
        $(
            #[doc = concat!("Registers a context handler for `", stringify!($name), "` requests.")]
            ///
            /// # Errors
            ///
            /// Returns the [`RouteError`] of the insertion.
            pub fn $name<F, Fut, E>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RouteError>
            where
                F: Fn(RequestContext, CanonicalRequest) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<CanonicalResponse, E>> + Send + 'static,
                E: Into<BoxError> + 'static,
            {
                self.handle($method, pattern, f)
            }
        )*
    };
}

impl<'s, S: RouteSink> Group<'s, S> {
    pub(crate) fn new(sink: &'s mut S, prefix: impl Into<String>) -> Self {
        Self { sink, prefix: prefix.into() }
    }

    /// The prefix every pattern of this group is registered under.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A child group whose prefix is this group's prefix followed by `prefix`.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` when `prefix` doesn't start with `/`.
    pub fn group(&mut self, prefix: &str) -> Result<Group<'_, S>, RouteError> {
        if !prefix.starts_with('/') {
            return Err(RouteError::invalid_pattern(prefix, "group prefix must start with '/'"));
        }
        let prefix = format!("{}{}", self.prefix, prefix.trim_end_matches('/'));
        Ok(Group { sink: &mut *self.sink, prefix })
    }

    /// Switches to the context surface, keeping this group's prefix.
    pub fn using_context(&mut self) -> ContextGroup<'_, S> {
        ContextGroup { group: Group { sink: &mut *self.sink, prefix: self.prefix.clone() } }
    }

    /// Registers `handler` for `method` at this group's prefix plus `pattern`.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` when a non-empty `pattern` doesn't start with `/`,
    /// otherwise the [`RouteError`] of the insertion.
    pub fn handle(&mut self, method: Method, pattern: &str, handler: impl RequestHandler + 'static) -> Result<&mut Self, RouteError> {
        if !pattern.is_empty() && !pattern.starts_with('/') {
            return Err(RouteError::invalid_pattern(pattern, "pattern must start with '/'"));
        }
        let full_pattern = format!("{}{}", self.prefix, pattern);
        self.sink.add_route(method, &full_pattern, Arc::new(handler))?;
        Ok(self)
    }

    method_routes! {
        get => Method::Get,
        post => Method::Post,
        put => Method::Put,
        patch => Method::Patch,
        delete => Method::Delete,
        head => Method::Head,
        options => Method::Options,
        connect => Method::Connect,
        trace => Method::Trace,
    }
}

impl<S: RouteSink> ContextGroup<'_, S> {
    /// A child group of the context surface.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` when `prefix` doesn't start with `/`.
    pub fn group(&mut self, prefix: &str) -> Result<ContextGroup<'_, S>, RouteError> {
        Ok(ContextGroup { group: self.group.group(prefix)? })
    }

    /// # Errors
    ///
    /// Returns the [`RouteError`] of the insertion.
    pub fn handle<F, Fut, E>(&mut self, method: Method, pattern: &str, f: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(RequestContext, CanonicalRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CanonicalResponse, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.group.handle(method, pattern, context_fn(f))?;
        Ok(self)
    }

    context_routes! {
        get => Method::Get,
        post => Method::Post,
        put => Method::Put,
        patch => Method::Patch,
        delete => Method::Delete,
        head => Method::Head,
        options => Method::Options,
        connect => Method::Connect,
        trace => Method::Trace,
    }
}
