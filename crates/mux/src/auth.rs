//! The authorization gate.
//!
//! An [`Authorizer`] receives an API-gateway style `REQUEST` authorizer
//! event built from the canonical request and answers with a policy and a
//! context map. The context is merged into the request before the handler
//! runs. What happens when the authorizer fails is decided by the router's
//! [`AuthFailurePolicy`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::canonical::CanonicalRequest;
use crate::config::{AuthFailurePolicy, DeploymentIdentity};
use crate::error::BoxError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, request: AuthorizerRequest) -> Result<AuthorizerResponse, BoxError>;
}

/// The event an authorizer receives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorizerRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub method_arn: String,
    pub resource: String,
    pub path: String,
    pub http_method: String,
    pub headers: BTreeMap<String, String>,
    pub query_string_parameters: BTreeMap<String, String>,
    pub path_parameters: BTreeMap<String, String>,
    pub stage_variables: BTreeMap<String, String>,
}

/// What an authorizer answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: serde_json::Value,
    pub context: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_identifier_key: Option<String>,
}

/// An authorizer built from an async function.
#[derive(Debug)]
pub struct AuthorizerFn<F> {
    f: F,
}

pub fn authorizer_fn<F, Fut>(f: F) -> AuthorizerFn<F>
where
    F: Fn(AuthorizerRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AuthorizerResponse, BoxError>> + Send,
{
    AuthorizerFn { f }
}

#[async_trait]
impl<F, Fut> Authorizer for AuthorizerFn<F>
where
    F: Fn(AuthorizerRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AuthorizerResponse, BoxError>> + Send,
{
    async fn authorize(&self, request: AuthorizerRequest) -> Result<AuthorizerResponse, BoxError> {
        (self.f)(request).await
    }
}

/// `arn:aws:execute-api:{region}:{account}:{api}/{stage}/{METHOD}/{path}`
///
/// A request without stage uses `*`.
pub fn method_arn(identity: &DeploymentIdentity, req: &CanonicalRequest) -> String {
    let stage = if req.stage.is_empty() { "*" } else { req.stage.as_str() };
    format!(
        "arn:aws:execute-api:{}:{}:{}/{}/{}/{}",
        identity.region,
        identity.account_id,
        identity.api_id,
        stage,
        req.method,
        req.path.trim_start_matches('/')
    )
}

pub fn authorizer_request(identity: &DeploymentIdentity, req: &CanonicalRequest) -> AuthorizerRequest {
    AuthorizerRequest {
        kind: "REQUEST".to_owned(),
        method_arn: method_arn(identity, req),
        resource: req.path.clone(),
        path: req.path.clone(),
        http_method: req.method.to_string(),
        headers: req.headers.clone(),
        query_string_parameters: req.query_parameters.clone(),
        path_parameters: req.path_parameters.clone(),
        stage_variables: req.stage_variables.clone(),
    }
}

/// Runs `authorizer` for `req`, merging the returned context into it.
///
/// Returns whether the request may proceed to its handler.
pub(crate) async fn authorize(
    authorizer: &dyn Authorizer,
    policy: AuthFailurePolicy,
    identity: &DeploymentIdentity,
    req: &mut CanonicalRequest,
) -> bool {
    match authorizer.authorize(authorizer_request(identity, req)).await {
        Ok(response) => {
            debug!(principal = %response.principal_id, "request authorized");
            req.authorizer_context.extend(response.context);
            true
        }
        Err(e) => {
            warn!(cause = %e, path = %req.path, ?policy, "authorizer failed");
            req.authorizer_context.clear();
            policy == AuthFailurePolicy::FailOpen
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use serde_json::json;

    fn identity() -> DeploymentIdentity {
        DeploymentIdentity { region: "eu-west-1".to_owned(), account_id: "123456789012".to_owned(), ..DeploymentIdentity::default() }
    }

    fn request() -> CanonicalRequest {
        let mut req = CanonicalRequest::new(Method::Get, "/prod/hello").with_header("Authorization", "Bearer t");
        req.stage = "prod".to_owned();
        req
    }

    #[test]
    fn arn_has_region_account_and_route() {
        assert_eq!(method_arn(&identity(), &request()), "arn:aws:execute-api:eu-west-1:123456789012:localhost/prod/GET/prod/hello");

        let no_stage = CanonicalRequest::new(Method::Post, "/a");
        assert_eq!(method_arn(&identity(), &no_stage), "arn:aws:execute-api:eu-west-1:123456789012:localhost/*/POST/a");
    }

    #[test]
    fn authorizer_request_serializes_with_type() {
        let event = authorizer_request(&identity(), &request());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "REQUEST");
        assert_eq!(json["httpMethod"], "GET");
        assert_eq!(json["headers"]["Authorization"], "Bearer t");
    }

    #[tokio::test]
    async fn success_merges_context() {
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_authorize().times(1).returning(|request| {
            assert_eq!(request.kind, "REQUEST");
            Ok(AuthorizerResponse { context: BTreeMap::from([("user".to_owned(), json!("alice"))]), ..AuthorizerResponse::default() })
        });

        let mut req = request();
        assert!(authorize(&authorizer, AuthFailurePolicy::FailClosed, &identity(), &mut req).await);
        assert_eq!(req.authorizer_context.get("user"), Some(&json!("alice")));
    }

    #[tokio::test]
    async fn failure_follows_policy() {
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_authorize().times(2).returning(|_| Err("token expired".into()));

        let mut req = request();
        assert!(!authorize(&authorizer, AuthFailurePolicy::FailClosed, &identity(), &mut req).await);

        let mut req = request();
        assert!(authorize(&authorizer, AuthFailurePolicy::FailOpen, &identity(), &mut req).await);
        assert!(req.authorizer_context.is_empty());
    }
}
