//! Request scoped values handed to handlers next to the [`CanonicalRequest`](crate::CanonicalRequest).
//!
//! - `PathParams`: the values captured by the matched route
//! - `RequestContext`: path parameters plus the resolved stage

use std::collections::BTreeMap;

/// Path parameters extracted from the request path, keyed by wildcard name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: BTreeMap<String, String>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.params.get(key.as_ref()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl From<BTreeMap<String, String>> for PathParams {
    fn from(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }
}

/// What the context surface passes to handlers instead of explicit parameters.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path_params: PathParams,
    stage: String,
}

impl RequestContext {
    pub fn new(path_params: PathParams, stage: impl Into<String>) -> Self {
        Self { path_params, stage: stage.into() }
    }

    /// Returns a reference to the path parameters extracted from the request path
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// The deployment stage the request was routed under
    pub fn stage(&self) -> &str {
        &self.stage
    }
}
