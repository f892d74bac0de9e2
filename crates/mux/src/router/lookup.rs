//! Turning a request into a routing decision.
//!
//! The steps run in a fixed order:
//!
//! 1. search the raw path
//! 2. search it again without its trailing slash, if trailing slash
//!    redirection is on
//! 3. search the cleaned path (and the cleaned path without its slash), if
//!    clean path redirection is on; a hit redirects there, or keeps going
//!    with that node when the method's behavior is `UseHandler`
//! 4. nothing found is `NotFound`
//! 5. a node without a handler for the method is `MethodNotAllowed`, unless
//!    an OPTIONS handler answers
//! 6. a trailing slash differing from the registered route redirects
//! 7. anything else is `Matched`

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use tracing::debug;

use crate::canonical::CanonicalRequest;
use crate::clean_path::clean_path;
use crate::config::RouterConfig;
use crate::method::Method;
use crate::router::store::{HandlerTrie, SharedHandler};
use crate::trie::TrieMatch;

/// The outcome of [`Router::lookup`](crate::Router::lookup); pass it to
/// [`Router::serve_lookup_result`](crate::Router::serve_lookup_result) to answer the request.
pub enum LookupResult {
    Matched { handler: SharedHandler, params: BTreeMap<String, String> },
    NotFound,
    /// The path exists, the method doesn't; `allowed` is sorted.
    MethodNotAllowed { allowed: Vec<Method> },
    /// `location` keeps the request's query string.
    RedirectRequired { location: String, status: StatusCode },
}

impl LookupResult {
    /// The status the answer will have, `200` for a match.
    pub fn status_code(&self) -> StatusCode {
        match self {
            LookupResult::Matched { .. } => StatusCode::OK,
            LookupResult::NotFound => StatusCode::NOT_FOUND,
            LookupResult::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            LookupResult::RedirectRequired { status, .. } => *status,
        }
    }

    /// True for a match or a redirect pointing at a real route.
    pub fn is_found(&self) -> bool {
        matches!(self, LookupResult::Matched { .. } | LookupResult::RedirectRequired { .. })
    }
}

impl fmt::Debug for LookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupResult::Matched { params, .. } => f.debug_struct("Matched").field("params", params).finish_non_exhaustive(),
            LookupResult::NotFound => f.write_str("NotFound"),
            LookupResult::MethodNotAllowed { allowed } => f.debug_struct("MethodNotAllowed").field("allowed", allowed).finish(),
            LookupResult::RedirectRequired { location, status } => {
                f.debug_struct("RedirectRequired").field("location", location).field("status", status).finish()
            }
        }
    }
}

pub(crate) fn lookup(
    trie: &HandlerTrie,
    config: &RouterConfig,
    options_handler: Option<&SharedHandler>,
    req: &CanonicalRequest,
) -> LookupResult {
    let method = req.method;
    let path = if req.path.is_empty() { "/" } else { req.path.as_str() };
    let trailing_slash = path.len() > 1 && path.ends_with('/');

    let mut found = search(trie, config, method, path);

    if found.is_none() && config.redirect_clean_path {
        let cleaned = clean_path(path);
        if cleaned != path {
            let Some((hit, hit_path)) = search(trie, config, method, &cleaned) else {
                debug!(%method, path, "no route found");
                return LookupResult::NotFound;
            };

            match config.redirect_behavior_for(method).status_code() {
                Some(status) => {
                    debug!(%method, path, location = %hit_path, "redirect to clean path");
                    return redirect(&hit_path, status, &req.raw_query);
                }
                None => found = Some((hit, hit_path)),
            }
        }
    }

    let Some((found, found_path)) = found else {
        debug!(%method, path, "no route found");
        return LookupResult::NotFound;
    };

    let handler = match found.handler() {
        Some(handler) => Arc::clone(handler),
        None => match options_handler {
            Some(options_handler) if method == Method::Options => Arc::clone(options_handler),
            _ => {
                debug!(%method, path, allowed = ?found.methods(), "method not allowed");
                return LookupResult::MethodNotAllowed { allowed: found.methods().to_vec() };
            }
        },
    };

    let slash_checked = !found.is_catch_all() || config.remove_catch_all_trailing_slash;
    if slash_checked
        && config.redirect_trailing_slash
        && trailing_slash != found.add_slash()
        && let Some(status) = config.redirect_behavior_for(method).status_code()
    {
        let base = strip_trailing_slash(&found_path);
        if found.add_slash() {
            return redirect(&format!("{base}/"), status, &req.raw_query);
        }
        if base != "/" {
            return redirect(base, status, &req.raw_query);
        }
    }

    debug!(%method, path, "route matched");
    LookupResult::Matched { handler, params: found.into_params() }
}

/// Searches `path`, then `path` without its trailing slash when trailing
/// slash redirection is on. Returns the match with the path that matched.
fn search<'t>(
    trie: &'t HandlerTrie,
    config: &RouterConfig,
    method: Method,
    path: &str,
) -> Option<(TrieMatch<'t, SharedHandler>, String)> {
    if let Some(found) = trie.search(method, path) {
        return Some((found, path.to_owned()));
    }

    let trimmed = strip_trailing_slash(path);
    if config.redirect_trailing_slash && trimmed.len() < path.len() {
        return trie.search(method, trimmed).map(|found| (found, trimmed.to_owned()));
    }
    None
}

fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 { path.strip_suffix('/').unwrap_or(path) } else { path }
}

fn redirect(path: &str, status: StatusCode, raw_query: &str) -> LookupResult {
    let location = if raw_query.is_empty() { path.to_owned() } else { format!("{path}?{raw_query}") };
    LookupResult::RedirectRequired { location, status }
}
