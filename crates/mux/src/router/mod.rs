//! The router: route storage, lookup and dispatch.
//!
//! A request goes through [`Router::lookup`], which only decides, and
//! [`Router::serve_lookup_result`], which resolves the stage, runs the
//! authorization gate and calls the handler or the matching collaborator.
//! [`Router::dispatch`] does both.

mod lookup;
mod store;

pub use lookup::LookupResult;
pub use store::HandlerTrie;
pub use store::Registrar;
pub use store::RouteSink;
pub use store::SharedHandler;
pub use store::TrieStore;

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::StatusCode;
use tracing::{debug, error};

use crate::auth::{self, Authorizer};
use crate::canonical::{CanonicalRequest, CanonicalResponse};
use crate::config::{
    AuthFailurePolicy, ConcurrencyMode, DeploymentIdentity, RedirectBehavior, RouterConfig, TransportMode,
};
use crate::error::{BoxError, RouteError};
use crate::group::Group;
use crate::handler::RequestHandler;
use crate::method::Method;
use crate::request::{PathParams, RequestContext};
use crate::stage::{self, StageVariables};
use crate::transport::template::GREEDY_PROXY;
use crate::trie::TrieOptions;

/// Answers requests no route matches.
pub type NotFoundHandler = Arc<dyn Fn(&CanonicalRequest) -> CanonicalResponse + Send + Sync>;

/// Answers requests whose path matches but whose method doesn't; receives the
/// sorted methods registered at that path.
pub type MethodNotAllowedHandler = Arc<dyn Fn(&CanonicalRequest, &[Method]) -> CanonicalResponse + Send + Sync>;

/// Answers requests whose handler panicked; receives the request's method
/// and path and the panic payload.
pub type PanicHandler = Arc<dyn Fn(Method, &str, Box<dyn Any + Send>) -> CanonicalResponse + Send + Sync>;

pub struct Router {
    config: RouterConfig,
    store: TrieStore,
    not_found: NotFoundHandler,
    method_not_allowed: MethodNotAllowedHandler,
    panic_handler: PanicHandler,
    options_handler: Option<SharedHandler>,
    authorizer: Option<Arc<dyn Authorizer>>,
    stage_variables: StageVariables,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The root group. Behind a socket its prefix is the synthetic stage
    /// wildcard, so `/hello` is served at `/{stage}/hello`.
    pub fn routes(&mut self) -> Group<'_, TrieStore> {
        let prefix = self.route_prefix();
        Group::new(&mut self.store, prefix)
    }

    /// A handle adding routes while the router serves.
    ///
    /// # Errors
    ///
    /// `StaticRegistration` unless the router was built in
    /// [`ConcurrencyMode::MutableWhileServing`].
    pub fn registrar(&self) -> Result<Registrar, RouteError> {
        let trie = self.store.shared().ok_or(RouteError::StaticRegistration)?;
        Ok(Registrar::new(Arc::clone(trie), self.route_prefix()))
    }

    /// Replaces the stage variables; [`serve`](Router::serve) sets them too.
    pub fn set_stage_variables(&mut self, stage_variables: StageVariables) {
        self.stage_variables = stage_variables;
    }

    /// Renders the route tree.
    pub fn dump(&self) -> String {
        self.store.read(HandlerTrie::dump)
    }

    /// Decides how `req` would be answered, without serving it.
    pub fn lookup(&self, req: &CanonicalRequest) -> LookupResult {
        self.store.read(|trie| lookup::lookup(trie, &self.config, self.options_handler.as_ref(), req))
    }

    /// Answers `req` according to a decision of [`lookup`](Router::lookup).
    ///
    /// # Errors
    ///
    /// Handler errors are returned unchanged.
    pub async fn serve_lookup_result(&self, mut req: CanonicalRequest, result: LookupResult) -> Result<CanonicalResponse, BoxError> {
        let (handler, mut params) = match result {
            LookupResult::Matched { handler, params } => (handler, params),
            LookupResult::NotFound => return Ok((self.not_found)(&req)),
            LookupResult::MethodNotAllowed { allowed } => return Ok((self.method_not_allowed)(&req, &allowed)),
            LookupResult::RedirectRequired { location, status } => {
                return Ok(CanonicalResponse::new(status).with_header("Location", location));
            }
        };

        match self.config.transport {
            TransportMode::Socket => {
                stage::inject_captured_stage(&mut req, &mut params, &self.stage_variables);
                req.path_parameters = params;

                if let Some(authorizer) = &self.authorizer {
                    let allowed = auth::authorize(
                        authorizer.as_ref(),
                        self.config.auth_failure_policy,
                        &self.config.deployment,
                        &mut req,
                    )
                    .await;
                    if !allowed {
                        return Ok(forbidden());
                    }
                }
            }
            TransportMode::Invocation { .. } => {
                stage::inject_event_stage(&mut req, &self.stage_variables);
                if req.resource.contains(GREEDY_PROXY) || req.path_parameters.is_empty() {
                    req.path_parameters = params;
                }
            }
        }

        debug!(method = %req.method, path = %req.path, stage = %req.stage, "invoke handler");
        let (method, path) = (req.method, req.path.clone());
        let ctx = RequestContext::new(PathParams::from(req.path_parameters.clone()), req.stage.clone());
        match AssertUnwindSafe(handler.invoke(ctx, req)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Ok((self.panic_handler)(method, &path, payload)),
        }
    }

    /// Looks `req` up and serves the result.
    ///
    /// # Errors
    ///
    /// Handler errors are returned unchanged.
    pub async fn dispatch(&self, req: CanonicalRequest) -> Result<CanonicalResponse, BoxError> {
        let result = self.lookup(&req);
        self.serve_lookup_result(req, result).await
    }

    pub(crate) fn authorizer(&self) -> Option<&Arc<dyn Authorizer>> {
        self.authorizer.as_ref()
    }

    fn route_prefix(&self) -> &'static str {
        if self.config.transport.is_socket() { stage::STAGE_PREFIX } else { "" }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("authorizer", &self.authorizer.is_some())
            .field("stage_variables", &self.stage_variables)
            .finish_non_exhaustive()
    }
}

/// `404` with `{"error": "Not Found"}`.
pub fn default_not_found(_req: &CanonicalRequest) -> CanonicalResponse {
    CanonicalResponse::json(StatusCode::NOT_FOUND, r#"{"error": "Not Found"}"#)
}

/// `405` with `{"error": "Method Not Allowed"}` and the `Allow` header.
pub fn default_method_not_allowed(_req: &CanonicalRequest, allowed: &[Method]) -> CanonicalResponse {
    let allow: Vec<_> = allowed.iter().map(|method| method.as_str()).collect();
    CanonicalResponse::json(StatusCode::METHOD_NOT_ALLOWED, r#"{"error": "Method Not Allowed"}"#)
        .with_header("Allow", allow.join(", "))
}

/// `500` with `{"error": "Internal Server Error"}`, logging the panic message.
pub fn default_panic_handler(method: Method, path: &str, payload: Box<dyn Any + Send>) -> CanonicalResponse {
    error!(%method, path, cause = panic_message(payload.as_ref()), "handler panicked");
    CanonicalResponse::json(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": "Internal Server Error"}"#)
}

/// The message of a panic payload, when it carries one.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn forbidden() -> CanonicalResponse {
    CanonicalResponse::json(StatusCode::FORBIDDEN, r#"{"error": "Forbidden"}"#)
}

pub struct RouterBuilder {
    config: RouterConfig,
    not_found: NotFoundHandler,
    method_not_allowed: MethodNotAllowedHandler,
    panic_handler: PanicHandler,
    options_handler: Option<SharedHandler>,
    authorizer: Option<Arc<dyn Authorizer>>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            not_found: Arc::new(default_not_found),
            method_not_allowed: Arc::new(default_method_not_allowed),
            panic_handler: Arc::new(default_panic_handler),
            options_handler: None,
            authorizer: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transport(mut self, transport: TransportMode) -> Self {
        self.config.transport = transport;
        self
    }

    pub fn concurrency(mut self, concurrency: ConcurrencyMode) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn redirect_trailing_slash(mut self, enabled: bool) -> Self {
        self.config.redirect_trailing_slash = enabled;
        self
    }

    pub fn redirect_clean_path(mut self, enabled: bool) -> Self {
        self.config.redirect_clean_path = enabled;
        self
    }

    pub fn redirect_behavior(mut self, behavior: RedirectBehavior) -> Self {
        self.config.redirect_behavior = behavior;
        self
    }

    /// Overrides the redirect behavior for one method.
    pub fn redirect_method_behavior(mut self, method: Method, behavior: RedirectBehavior) -> Self {
        self.config.redirect_method_behavior.insert(method, behavior);
        self
    }

    pub fn head_can_use_get(mut self, enabled: bool) -> Self {
        self.config.head_can_use_get = enabled;
        self
    }

    pub fn remove_catch_all_trailing_slash(mut self, enabled: bool) -> Self {
        self.config.remove_catch_all_trailing_slash = enabled;
        self
    }

    pub fn catch_all_matches_empty(mut self, enabled: bool) -> Self {
        self.config.catch_all_matches_empty = enabled;
        self
    }

    pub fn auth_failure_policy(mut self, policy: AuthFailurePolicy) -> Self {
        self.config.auth_failure_policy = policy;
        self
    }

    pub fn deployment(mut self, deployment: DeploymentIdentity) -> Self {
        self.config.deployment = deployment;
        self
    }

    pub fn not_found<F>(mut self, f: F) -> Self
    where
        F: Fn(&CanonicalRequest) -> CanonicalResponse + Send + Sync + 'static,
    {
        self.not_found = Arc::new(f);
        self
    }

    pub fn method_not_allowed<F>(mut self, f: F) -> Self
    where
        F: Fn(&CanonicalRequest, &[Method]) -> CanonicalResponse + Send + Sync + 'static,
    {
        self.method_not_allowed = Arc::new(f);
        self
    }

    /// Replaces the answer to a panicking handler, which is a `500` by default.
    pub fn panic_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(Method, &str, Box<dyn Any + Send>) -> CanonicalResponse + Send + Sync + 'static,
    {
        self.panic_handler = Arc::new(f);
        self
    }

    /// Answers `OPTIONS` requests for paths that have no `OPTIONS` route.
    pub fn options_handler(mut self, handler: impl RequestHandler + 'static) -> Self {
        self.options_handler = Some(Arc::new(handler));
        self
    }

    pub fn authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    pub fn build(self) -> Router {
        let options = TrieOptions {
            head_can_use_get: self.config.head_can_use_get,
            catch_all_matches_empty: self.config.catch_all_matches_empty,
        };
        Router {
            store: TrieStore::new(self.config.concurrency, options),
            config: self.config,
            not_found: self.not_found,
            method_not_allowed: self.method_not_allowed,
            panic_handler: self.panic_handler,
            options_handler: self.options_handler,
            authorizer: self.authorizer,
            stage_variables: StageVariables::new(),
        }
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::auth::{AuthorizerResponse, MockAuthorizer};
    use crate::handler::handler_fn;

    async fn echo(req: CanonicalRequest, params: PathParams) -> Result<CanonicalResponse, BoxError> {
        let body = json!({
            "path": req.path,
            "stage": req.stage,
            "params": req.path_parameters,
            "name": params.get("name"),
            "variables": req.stage_variables,
            "auth": req.authorizer_context,
        });
        Ok(CanonicalResponse::json(StatusCode::OK, body.to_string()))
    }

    fn body(response: &CanonicalResponse) -> serde_json::Value {
        serde_json::from_str(&response.body).unwrap()
    }

    fn stages() -> StageVariables {
        BTreeMap::from([
            ("stageA".to_owned(), BTreeMap::from([("db".to_owned(), "a".to_owned())])),
            ("stageB".to_owned(), BTreeMap::from([("db".to_owned(), "b".to_owned()), ("debug".to_owned(), "1".to_owned())])),
        ])
    }

    #[tokio::test]
    async fn socket_stage_injection_is_isolated() {
        let mut router = Router::builder().build();
        router.routes().get("/hello", handler_fn(echo)).unwrap();
        router.set_stage_variables(stages());

        let a = router.dispatch(CanonicalRequest::new(Method::Get, "/stageA/hello")).await.unwrap();
        let b = router.dispatch(CanonicalRequest::new(Method::Get, "/stageB/hello")).await.unwrap();

        let (a, b) = (body(&a), body(&b));
        assert_eq!(a["stage"], "stageA");
        assert_eq!(a["variables"], json!({"db": "a"}));
        assert_eq!(b["stage"], "stageB");
        assert_eq!(b["variables"], json!({"db": "b", "debug": "1"}));
        assert_eq!(a["params"], json!({}));
        assert_eq!(b["params"], json!({}));
    }

    #[tokio::test]
    async fn default_collaborators() {
        let mut router = Router::builder().build();
        router.routes().get("/items/:name", handler_fn(echo)).unwrap().post("/items/:name", handler_fn(echo)).unwrap();

        let response = router.dispatch(CanonicalRequest::new(Method::Get, "/prod/nothing")).await.unwrap();
        assert_eq!(response.status_code, 404);
        assert_eq!(response.body, r#"{"error": "Not Found"}"#);

        let response = router.dispatch(CanonicalRequest::new(Method::Delete, "/prod/items/x")).await.unwrap();
        assert_eq!(response.status_code, 405);
        assert_eq!(response.header("Allow"), Some("GET, HEAD, POST"));
        assert_eq!(response.body, r#"{"error": "Method Not Allowed"}"#);

        let response = router.dispatch(CanonicalRequest::new(Method::Get, "/prod/items/x/")).await.unwrap();
        assert_eq!(response.status_code, 301);
        assert_eq!(response.header("Location"), Some("/prod/items/x"));
    }

    #[tokio::test]
    async fn custom_not_found() {
        let router = Router::builder().not_found(|req| CanonicalResponse::new(StatusCode::NOT_FOUND).with_body(req.path.clone())).build();
        let response = router.dispatch(CanonicalRequest::new(Method::Get, "/x/y")).await.unwrap();
        assert_eq!(response.body, "/x/y");
    }

    #[tokio::test]
    async fn invocation_mode_has_no_stage_prefix() {
        let mut router = Router::builder().transport(TransportMode::Invocation { authorizer_only: false }).build();
        router.routes().get("/hello/:name", handler_fn(echo)).unwrap();
        router.set_stage_variables(stages());

        let mut req = CanonicalRequest::new(Method::Get, "/hello/ferris");
        req.resource = "/hello/{name}".to_owned();
        req.stage = "stageA".to_owned();
        req.path_parameters = BTreeMap::from([("name".to_owned(), "ferris".to_owned())]);

        let response = body(&router.dispatch(req).await.unwrap());
        assert_eq!(response["name"], "ferris");
        assert_eq!(response["variables"], json!({"db": "a"}));
    }

    #[tokio::test]
    async fn greedy_proxy_uses_router_params() {
        let mut router = Router::builder().transport(TransportMode::Invocation { authorizer_only: false }).build();
        router.routes().get("/users/:name", handler_fn(echo)).unwrap();

        let mut req = CanonicalRequest::new(Method::Get, "/users/bob");
        req.resource = "/{proxy+}".to_owned();
        req.path_parameters = BTreeMap::from([("proxy".to_owned(), "users/bob".to_owned())]);

        let response = body(&router.dispatch(req).await.unwrap());
        assert_eq!(response["params"], json!({"name": "bob"}));
    }

    #[tokio::test]
    async fn authorizer_context_reaches_handler() {
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_authorize().returning(|request| {
            assert!(request.method_arn.ends_with("/prod/GET/prod/hello"));
            Ok(AuthorizerResponse { context: BTreeMap::from([("user".to_owned(), json!("alice"))]), ..AuthorizerResponse::default() })
        });

        let mut router = Router::builder().authorizer(authorizer).build();
        router.routes().get("/hello", handler_fn(echo)).unwrap();

        let response = router.dispatch(CanonicalRequest::new(Method::Get, "/prod/hello")).await.unwrap();
        assert_eq!(body(&response)["auth"], json!({"user": "alice"}));
    }

    #[tokio::test]
    async fn authorizer_failure_policies() {
        fn failing() -> MockAuthorizer {
            let mut authorizer = MockAuthorizer::new();
            authorizer.expect_authorize().returning(|_| Err("denied".into()));
            authorizer
        }

        let mut router = Router::builder().authorizer(failing()).build();
        router.routes().get("/hello", handler_fn(echo)).unwrap();
        let response = router.dispatch(CanonicalRequest::new(Method::Get, "/prod/hello")).await.unwrap();
        assert_eq!(response.status_code, 403);

        let mut router = Router::builder().authorizer(failing()).auth_failure_policy(AuthFailurePolicy::FailOpen).build();
        router.routes().get("/hello", handler_fn(echo)).unwrap();
        let response = router.dispatch(CanonicalRequest::new(Method::Get, "/prod/hello")).await.unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(body(&response)["auth"], json!({}));
    }

    #[tokio::test]
    async fn registrar_adds_routes_while_shared() {
        let router = Router::builder().concurrency(ConcurrencyMode::MutableWhileServing).build();
        let mut registrar = router.registrar().unwrap();

        let req = CanonicalRequest::new(Method::Get, "/prod/late");
        assert!(matches!(router.lookup(&req), LookupResult::NotFound));

        registrar.routes().get("/late", handler_fn(echo)).unwrap();
        assert!(matches!(router.lookup(&req), LookupResult::Matched { .. }));

        let static_router = Router::builder().build();
        assert!(matches!(static_router.registrar(), Err(RouteError::StaticRegistration)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn registrar_inserts_while_lookups_run() {
        const ROUTES: usize = 50;

        let router = Arc::new(Router::builder().concurrency(ConcurrencyMode::MutableWhileServing).build());
        let mut registrar = router.registrar().unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    let mut seen = 0;
                    while seen < ROUTES {
                        let req = CanonicalRequest::new(Method::Get, format!("/prod/late/{seen}"));
                        match router.lookup(&req) {
                            LookupResult::Matched { .. } => seen += 1,
                            LookupResult::NotFound => tokio::task::yield_now().await,
                            other => panic!("unexpected lookup result {other:?}"),
                        }
                    }
                })
            })
            .collect();

        let writer = tokio::spawn(async move {
            for i in 0..ROUTES {
                registrar.routes().get(&format!("/late/{i}"), handler_fn(echo)).unwrap();
                tokio::task::yield_now().await;
            }
        });

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert!(router.dump().contains("late"));
    }

    #[tokio::test]
    async fn panicking_handler_is_answered() {
        async fn boom(_req: CanonicalRequest, _params: PathParams) -> Result<CanonicalResponse, BoxError> {
            panic!("boom")
        }

        let mut router = Router::builder().build();
        router.routes().get("/boom", handler_fn(boom)).unwrap();
        let response = router.dispatch(CanonicalRequest::new(Method::Get, "/prod/boom")).await.unwrap();
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, r#"{"error": "Internal Server Error"}"#);

        let mut router = Router::builder()
            .panic_handler(|method, path, payload| {
                CanonicalResponse::new(StatusCode::SERVICE_UNAVAILABLE).with_body(format!("{method} {path} {}", panic_message(payload.as_ref())))
            })
            .build();
        router.routes().get("/boom", handler_fn(boom)).unwrap();
        let response = router.dispatch(CanonicalRequest::new(Method::Get, "/prod/boom")).await.unwrap();
        assert_eq!(response.status_code, 503);
        assert_eq!(response.body, "GET /prod/boom boom");
    }

    #[test]
    fn patterns_need_a_leading_slash_in_both_modes() {
        let mut router = Router::builder().build();
        assert!(matches!(router.routes().get("hello", handler_fn(echo)), Err(RouteError::InvalidPattern { .. })));
        assert!(!router.dump().contains("__stage__hello"));
        assert!(matches!(router.lookup(&CanonicalRequest::new(Method::Get, "/anything")), LookupResult::NotFound));

        let mut router = Router::builder().transport(TransportMode::Invocation { authorizer_only: false }).build();
        assert!(matches!(router.routes().get("hello", handler_fn(echo)), Err(RouteError::InvalidPattern { .. })));
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let mut router = Router::builder().build();
        let mut routes = router.routes();
        routes.get("/a", handler_fn(echo)).unwrap();
        assert!(matches!(routes.get("/a", handler_fn(echo)), Err(RouteError::DuplicateRoute { .. })));
    }
}
