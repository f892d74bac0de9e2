//! A trie based HTTP router that serves the same routes behind a socket or
//! inside an invocation runtime.
//!
//! Routes are registered on a [`Router`] through [`Group`]s. Requests from
//! either transport are normalized into a [`CanonicalRequest`], matched
//! against the path trie, given their stage and stage variables, optionally
//! checked by an [`Authorizer`], and answered by the handler's
//! [`CanonicalResponse`].
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//!
//! use stagemux::{BoxError, CanonicalRequest, CanonicalResponse, PathParams, Router, TransportMode, handler_fn};
//!
//! async fn hello(req: CanonicalRequest, params: PathParams) -> Result<CanonicalResponse, BoxError> {
//!     let name = params.get("name").unwrap_or("world");
//!     Ok(CanonicalResponse::ok(format!("hello {name} from stage {}", req.stage)))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::builder().transport(TransportMode::from_env()).build();
//!     router.routes().get("/hello/:name", handler_fn(hello))?;
//!
//!     // served at /{stage}/hello/{name} behind a socket
//!     router.serve("127.0.0.1:8080", BTreeMap::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Patterns
//!
//! - `/users/:id`: `:id` matches one non-empty segment
//! - `/files/*path`: `*path` matches the rest of the path, last segment only
//! - `/dir/`: a trailing slash is part of the route; the other form redirects
//!
//! Literal segments win over `:name`, which wins over `*name`; the search
//! backtracks when a more specific branch leads nowhere.

mod auth;
mod canonical;
mod clean_path;
mod config;
mod error;
mod group;
mod handler;
mod method;
mod request;
mod server;
mod stage;
mod trie;

pub mod router;
pub mod transport;

pub use auth::Authorizer;
pub use auth::AuthorizerFn;
pub use auth::AuthorizerRequest;
pub use auth::AuthorizerResponse;
pub use auth::authorizer_fn;
pub use auth::authorizer_request;
pub use auth::method_arn;
pub use canonical::CanonicalRequest;
pub use canonical::CanonicalResponse;
pub use clean_path::clean_path;
pub use config::AuthFailurePolicy;
pub use config::ConcurrencyMode;
pub use config::DeploymentIdentity;
pub use config::RedirectBehavior;
pub use config::RouterConfig;
pub use config::TransportMode;
pub use error::BoxError;
pub use error::InvocationError;
pub use error::NormalizeError;
pub use error::RouteError;
pub use error::ServeError;
pub use error::TemplateError;
pub use group::ContextGroup;
pub use group::Group;
pub use handler::ContextFnHandler;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::context_fn;
pub use handler::handler_fn;
pub use method::Method;
pub use request::PathParams;
pub use request::RequestContext;
pub use router::LookupResult;
pub use router::Registrar;
pub use router::Router;
pub use router::RouterBuilder;
pub use router::SharedHandler;
pub use stage::StageVariables;
pub use trie::PathTrie;
pub use trie::TrieMatch;
pub use trie::TrieOptions;
