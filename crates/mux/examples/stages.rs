//! Serves the same routes for every stage.
//!
//! ```bash
//! cargo run --example stages
//! curl http://127.0.0.1:8080/prod/hello/ferris
//! curl http://127.0.0.1:8080/dev/hello/ferris
//! ```

use std::collections::BTreeMap;

use serde_json::json;
use stagemux::{
    BoxError, CanonicalRequest, CanonicalResponse, PathParams, RequestContext, Router, StageVariables, TransportMode,
    handler_fn,
};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

async fn hello(req: CanonicalRequest, params: PathParams) -> Result<CanonicalResponse, BoxError> {
    let greeting = req.stage_variables.get("greeting").map_or("hello", String::as_str);
    Ok(CanonicalResponse::ok(format!("{greeting} {}\n", params.get("name").unwrap_or("world"))))
}

async fn describe(ctx: RequestContext, req: CanonicalRequest) -> Result<CanonicalResponse, BoxError> {
    let body = json!({
        "stage": ctx.stage(),
        "path": req.path,
        "file": ctx.path_params().get("path"),
        "query": req.query_parameters,
    });
    Ok(CanonicalResponse::json(http::StatusCode::OK, body.to_string()))
}

fn stage_variables() -> StageVariables {
    BTreeMap::from([
        ("prod".to_owned(), BTreeMap::from([("greeting".to_owned(), "hello".to_owned())])),
        ("dev".to_owned(), BTreeMap::from([("greeting".to_owned(), "howdy".to_owned())])),
    ])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut router = Router::builder().transport(TransportMode::from_env()).build();
    let mut routes = router.routes();
    routes.get("/hello/:name", handler_fn(hello))?;
    routes.group("/files")?.using_context().get("/*path", describe)?;

    info!("routes:\n{}", router.dump());
    if let Err(e) = router.serve("127.0.0.1:8080", stage_variables()).await {
        error!(cause = %e, "server stopped");
        return Err(e.into());
    }
    Ok(())
}
