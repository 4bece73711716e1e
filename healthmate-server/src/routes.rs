use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.settings().max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ingest", post(handlers::ingest).layer(DefaultBodyLimit::max(upload_limit)))
        .route("/chat", post(handlers::chat))
        .route("/debug/retrieve", post(handlers::debug_retrieve))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
