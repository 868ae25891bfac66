mod docs;
mod health;
pub mod v1;

use aide::axum::{routing::get, ApiRouter};

/// Creates the router with all handler routes
///
/// The `/docs` and `/openapi.json` routes are only mounted when `show_docs` is set.
pub fn handler(show_docs: bool) -> ApiRouter {
    let router = ApiRouter::new()
        .api_route("/health", get(health::handler))
        .nest("/v1", v1::handler());

    if show_docs {
        router.merge(docs::handler())
    } else {
        router
    }
}
