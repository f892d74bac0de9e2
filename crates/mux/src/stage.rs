//! Deployment stage resolution.
//!
//! Behind a socket every route is registered under a synthetic `/:__stage__`
//! wildcard; the captured segment names the stage and is removed from the
//! path parameters. Invocation events carry their stage themselves.

use std::collections::BTreeMap;

use tracing::debug;

use crate::canonical::CanonicalRequest;

/// Stage name to the variables of that stage.
pub type StageVariables = BTreeMap<String, BTreeMap<String, String>>;

pub(crate) const STAGE_PARAM: &str = "__stage__";

/// Prefix of every route registered through a socket router's root group
pub(crate) const STAGE_PREFIX: &str = "/:__stage__";

/// Moves the captured stage segment out of `params` into the request, along
/// with the variables configured for that stage.
pub(crate) fn inject_captured_stage(req: &mut CanonicalRequest, params: &mut BTreeMap<String, String>, stages: &StageVariables) {
    if let Some(stage) = params.remove(STAGE_PARAM) {
        req.stage_variables = stages.get(&stage).cloned().unwrap_or_default();
        debug!(stage = %stage, variables = req.stage_variables.len(), "resolved stage from path");
        req.stage = stage;
    }
}

/// Fills in the configured variables when the event brought none.
pub(crate) fn inject_event_stage(req: &mut CanonicalRequest, stages: &StageVariables) {
    if req.stage_variables.is_empty()
        && let Some(variables) = stages.get(&req.stage)
    {
        req.stage_variables = variables.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    fn stages() -> StageVariables {
        BTreeMap::from([
            ("prod".to_owned(), BTreeMap::from([("table".to_owned(), "users".to_owned())])),
            ("dev".to_owned(), BTreeMap::from([("table".to_owned(), "users-dev".to_owned())])),
        ])
    }

    #[test]
    fn captured_stage_is_removed_from_params() {
        let mut req = CanonicalRequest::new(Method::Get, "/prod/hello");
        let mut params = BTreeMap::from([(STAGE_PARAM.to_owned(), "prod".to_owned()), ("id".to_owned(), "1".to_owned())]);

        inject_captured_stage(&mut req, &mut params, &stages());

        assert_eq!(req.stage, "prod");
        assert_eq!(req.stage_variables.get("table").map(String::as_str), Some("users"));
        assert_eq!(params.len(), 1);
        assert!(!params.contains_key(STAGE_PARAM));
    }

    #[test]
    fn unknown_stage_has_no_variables() {
        let mut req = CanonicalRequest::new(Method::Get, "/qa/hello");
        let mut params = BTreeMap::from([(STAGE_PARAM.to_owned(), "qa".to_owned())]);

        inject_captured_stage(&mut req, &mut params, &stages());
        assert_eq!(req.stage, "qa");
        assert!(req.stage_variables.is_empty());
    }

    #[test]
    fn event_variables_take_precedence() {
        let mut req = CanonicalRequest::new(Method::Get, "/hello");
        req.stage = "dev".to_owned();
        inject_event_stage(&mut req, &stages());
        assert_eq!(req.stage_variables.get("table").map(String::as_str), Some("users-dev"));

        req.stage_variables = BTreeMap::from([("table".to_owned(), "from-event".to_owned())]);
        inject_event_stage(&mut req, &stages());
        assert_eq!(req.stage_variables.get("table").map(String::as_str), Some("from-event"));
    }
}
