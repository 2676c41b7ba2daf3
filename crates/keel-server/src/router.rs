//! Axum router construction for the project service.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Largest accepted request body. Asset uploads carry whole files.
pub const MAX_BODY_BYTES: usize = 33_554_432;

/// Build the complete Axum router for the project service.
///
/// See [`handlers`] for the route table. CORS allows any origin so the
/// editor can call the service from a browser during development.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Projects
        .route("/v1/projects", post(handlers::create_project))
        .route(
            "/v1/projects/{id}",
            get(handlers::load_project).put(handlers::save_project),
        )
        .route("/v1/projects/{id}/owner", get(handlers::check_ownership))
        // Assets
        .route("/v1/projects/{id}/assets", put(handlers::save_assets))
        .route(
            "/v1/projects/{id}/assets/download",
            post(handlers::download_assets),
        )
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
