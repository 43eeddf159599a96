//! HTTP routes for the delivery server.

pub mod assets;
pub mod licenses;
pub mod stream;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/assets/:id/stream", get(stream::stream_asset))
        .route("/assets/:id/secure", put(assets::secure_asset))
        .route("/assets/:id/verify", put(assets::verify_asset))
        .route("/assets/:id", delete(assets::delete_asset))
        .route("/licenses/sync", post(licenses::sync_license))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
