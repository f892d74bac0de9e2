//! Router configuration.
//!
//! Every policy the router applies is a value in [`RouterConfig`], set
//! through [`Router::builder`](crate::Router::builder). The environment is
//! only consulted by the explicit loaders [`TransportMode::from_env`] and
//! [`DeploymentIdentity::from_env`].

use std::collections::BTreeMap;
use std::env;

use http::StatusCode;

use crate::method::Method;

/// How requests reach the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// A long-lived HTTP/1.1 listener. Routes get the synthetic stage prefix.
    #[default]
    Socket,
    /// One structured event per call. With `authorizer_only`, events are
    /// authorizer requests answered by the configured authorizer.
    Invocation { authorizer_only: bool },
}

impl TransportMode {
    /// `AWS_EXECUTION_ENV` unset or empty selects the socket; otherwise the
    /// invocation runtime, in authorizer-only mode when `AUTHORIZER=true`.
    pub fn from_env() -> Self {
        Self::from_vars(env::var("AWS_EXECUTION_ENV").ok().as_deref(), env::var("AUTHORIZER").ok().as_deref())
    }

    fn from_vars(execution_env: Option<&str>, authorizer: Option<&str>) -> Self {
        match execution_env {
            None | Some("") => TransportMode::Socket,
            Some(_) => TransportMode::Invocation { authorizer_only: authorizer == Some("true") },
        }
    }

    pub fn is_socket(self) -> bool {
        matches!(self, TransportMode::Socket)
    }
}

/// Whether routes can still be added once the router serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// Routes are registered before serving; lookups take no lock.
    #[default]
    Static,
    /// The trie sits behind a read/write lock so a
    /// [`Registrar`](crate::router::Registrar) can add routes while serving.
    MutableWhileServing,
}

/// What to answer when the requested path differs from the registered one
/// only by a trailing slash or by unclean segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectBehavior {
    /// 301 Moved Permanently
    #[default]
    Redirect301,
    /// 307 Temporary Redirect, keeps the method and body
    Redirect307,
    /// 308 Permanent Redirect, keeps the method and body
    Redirect308,
    /// Don't redirect, call the matched handler
    UseHandler,
}

impl RedirectBehavior {
    pub fn status_code(self) -> Option<StatusCode> {
        match self {
            RedirectBehavior::Redirect301 => Some(StatusCode::MOVED_PERMANENTLY),
            RedirectBehavior::Redirect307 => Some(StatusCode::TEMPORARY_REDIRECT),
            RedirectBehavior::Redirect308 => Some(StatusCode::PERMANENT_REDIRECT),
            RedirectBehavior::UseHandler => None,
        }
    }
}

/// What happens to a request when the authorizer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthFailurePolicy {
    /// Answer 403 without calling the handler.
    #[default]
    FailClosed,
    /// Log the failure and call the handler with an empty authorizer context.
    FailOpen,
}

/// Where the API is deployed; used to build authorizer resource identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentIdentity {
    pub region: String,
    pub account_id: String,
    pub api_id: String,
}

impl Default for DeploymentIdentity {
    fn default() -> Self {
        Self { region: String::new(), account_id: String::new(), api_id: "localhost".to_owned() }
    }
}

impl DeploymentIdentity {
    /// Reads `AWS_REGION` and `AWS_ACCOUNT_ID`, empty when unset.
    pub fn from_env() -> Self {
        Self {
            region: env::var("AWS_REGION").unwrap_or_default(),
            account_id: env::var("AWS_ACCOUNT_ID").unwrap_or_default(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub transport: TransportMode,
    pub concurrency: ConcurrencyMode,
    pub redirect_trailing_slash: bool,
    pub redirect_clean_path: bool,
    pub redirect_behavior: RedirectBehavior,
    pub redirect_method_behavior: BTreeMap<Method, RedirectBehavior>,
    pub head_can_use_get: bool,
    pub remove_catch_all_trailing_slash: bool,
    pub catch_all_matches_empty: bool,
    pub auth_failure_policy: AuthFailurePolicy,
    pub deployment: DeploymentIdentity,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::default(),
            concurrency: ConcurrencyMode::default(),
            redirect_trailing_slash: true,
            redirect_clean_path: true,
            redirect_behavior: RedirectBehavior::default(),
            redirect_method_behavior: BTreeMap::new(),
            head_can_use_get: true,
            remove_catch_all_trailing_slash: false,
            catch_all_matches_empty: false,
            auth_failure_policy: AuthFailurePolicy::default(),
            deployment: DeploymentIdentity::default(),
        }
    }
}

impl RouterConfig {
    /// The redirect behavior for `method`: its override if any, else the global one.
    pub fn redirect_behavior_for(&self, method: Method) -> RedirectBehavior {
        self.redirect_method_behavior.get(&method).copied().unwrap_or(self.redirect_behavior)
    }
}
