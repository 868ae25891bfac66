pub mod uploads;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};

/// Creates the v1 API router with all v1 handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route("/uploads", post(uploads::create_upload))
        .api_route("/uploads/config", get(uploads::get_upload_config))
}
