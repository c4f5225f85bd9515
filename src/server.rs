/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{ErrorResponse, HxResult, ManifestError},
};
use axum::{http::StatusCode, response::Json, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

/// Prefix the routes were historically published under
pub const API_PREFIX: &str = "/api/v1";

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .merge(crate::api::routes())
        .nest(API_PREFIX, crate::api::routes())
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx)
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error_code: StatusCode::NOT_FOUND.as_u16(),
            error_message: "endpoint not found".to_string(),
        }),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> HxResult<()> {
    let addr = format!("{}:{}", ctx.config.service.host, ctx.config.service.port);

    info!("hxprezi listening on {}", addr);
    info!("   Public manifests URL: {}", ctx.manifests_url());
    info!("   Providers: {:?}", ctx.resolver.providers().keys());

    let app = build_router(ctx);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ManifestError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ManifestError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
