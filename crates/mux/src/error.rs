use std::error::Error;
use std::io;

use thiserror::Error;

use crate::method::Method;

/// Error type of request handlers and authorizers.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Registration failures. They surface while the routes are built, before
/// anything is served.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("pattern '{pattern}' conflicts with '{existing}' already registered at the same position")]
    PatternConflict { pattern: String, existing: String },

    #[error("route {method} '{pattern}' is already registered")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("routes can only be added while serving in MutableWhileServing mode")]
    StaticRegistration,
}

impl RouteError {
    pub fn invalid_pattern<S: ToString>(pattern: &str, reason: S) -> Self {
        Self::InvalidPattern { pattern: pattern.to_owned(), reason: reason.to_string() }
    }

    pub fn pattern_conflict<S: ToString>(pattern: &str, existing: S) -> Self {
        Self::PatternConflict { pattern: pattern.to_owned(), existing: existing.to_string() }
    }

    pub fn duplicate_route(method: Method, pattern: &str) -> Self {
        Self::DuplicateRoute { method, pattern: pattern.to_owned() }
    }
}

/// Failures turning a transport request into a [`CanonicalRequest`](crate::CanonicalRequest).
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("unsupported http method: {method}")]
    UnsupportedMethod { method: String },

    #[error("invalid event: {reason}")]
    InvalidEvent { reason: String },
}

impl NormalizeError {
    pub fn unsupported_method<S: ToString>(method: S) -> Self {
        Self::UnsupportedMethod { method: method.to_string() }
    }

    pub fn invalid_event<S: ToString>(reason: S) -> Self {
        Self::InvalidEvent { reason: reason.to_string() }
    }
}

/// Failures rendering a `{name}` resource template. Callers fall back to the
/// literal path.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed placeholder in resource '{resource}'")]
    Unclosed { resource: String },

    #[error("no path parameter named '{name}'")]
    MissingParameter { name: String },
}

#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("invocation io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("invocation payload error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("bind server error: {source}")]
    Bind { source: io::Error },

    #[error("invocation runtime error: {source}")]
    Invocation {
        #[from]
        source: InvocationError,
    },
}
