use std::sync::Arc;

use aide::openapi::OpenApi;
use axum::{Extension, Router};
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;

use crate::routes;
use crate::{credential::CredentialIssuer, media_storage::MediaStorage, types::Environment};

/// Builds the application router with its shared dependencies attached
pub fn router(
    environment: &Environment,
    issuer: Arc<CredentialIssuer>,
    media_storage: Arc<MediaStorage>,
) -> Router {
    let mut openapi = OpenApi::default();

    routes::handler(environment.show_api_docs())
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(issuer))
        .layer(Extension(media_storage))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    issuer: Arc<CredentialIssuer>,
    media_storage: Arc<MediaStorage>,
) -> anyhow::Result<()> {
    let router = router(&environment, issuer, media_storage)
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default())
        .layer(tower_http::timeout::TimeoutLayer::new(
            std::time::Duration::from_secs(5),
        ));

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8001), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Upload API started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}
