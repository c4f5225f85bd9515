/// Manifest endpoints
use crate::{context::AppContext, error::HxResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;

/// Build manifest routes
pub fn routes() -> Router<AppContext> {
    Router::new().route(
        "/manifests/:manifest_id",
        get(get_manifest).delete(delete_manifest),
    )
}

/// Resolve a manifest
async fn get_manifest(
    State(ctx): State<AppContext>,
    Path(manifest_id): Path<String>,
) -> HxResult<Json<Value>> {
    let manifest = ctx.resolver.resolve(&manifest_id).await?;
    Ok(Json(manifest))
}

/// Invalidate a cached manifest
async fn delete_manifest(
    State(ctx): State<AppContext>,
    Path(manifest_id): Path<String>,
) -> HxResult<StatusCode> {
    ctx.resolver.invalidate(&manifest_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
