//! Router configuration for the extraction API.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    // Slack above the configured ceiling so our own size check decides
    // the 413, with its JSON detail, instead of the body-limit layer.
    let body_limit = state.settings.max_file_size_bytes() as usize + 1024 * 1024;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .route("/api/extract", post(handlers::extract))
        .route("/api/extract-stream", post(handlers::extract_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
