use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use datadog_tracing::axum::{OtelAxumLayer, OtelInResponseLayer};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Liveness endpoint
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "upload-processor",
            "semver": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Router serving the health endpoint
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .layer(OtelInResponseLayer)
        .layer(OtelAxumLayer::default())
}

/// Start the health check HTTP server
///
/// # Errors
///
/// Returns an error if the server fails to bind to the specified address
pub async fn start_health_server(shutdown_token: CancellationToken) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8002), |p| p.parse())?,
    ));
    let listener = TcpListener::bind(addr).await?;
    info!("Health check server listening on {}", addr);

    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
        })
        .await?;

    Ok(())
}
