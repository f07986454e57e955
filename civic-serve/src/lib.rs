//! civic-serve - HTTP JSON API over the Civicast workflow
//!
//! Endpoints:
//! - GET    /health
//! - POST   /generate-variations
//! - POST   /sessions, GET|DELETE /sessions/{id}
//! - POST   /sessions/{id}/generate
//! - PATCH  /sessions/{id}/variations/{index}
//! - POST   /sessions/{id}/variations/{index}/toggle
//! - POST   /sessions/{id}/select-all, /sessions/{id}/deselect-all
//! - POST   /sessions/{id}/schedule
//! - POST   /schedule-post, /schedule-batch
//! - GET    /posts, GET|PATCH|DELETE /posts/{id}
//! - GET    /stats, /profiles
//! - POST   /media
//!
//! Every response is JSON. Failures carry `{"error": "<message>"}` with 400
//! for invalid input, 404 for unknown ids, 409 for version conflicts and 500
//! for upstream or internal failures.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use self::error::{ApiError, ApiResult};
pub use self::state::AppState;

/// Headroom above the media limit for non-upload request bodies
const BODY_LIMIT_SLACK: usize = 64 * 1024;

async fn handle_not_found() -> impl IntoResponse {
    ApiError::new(StatusCode::NOT_FOUND, "No such endpoint")
}

/// Assemble the router with CORS, a body limit and a JSON 404 fallback
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.service.config().media.max_bytes + BODY_LIMIT_SLACK;

    // Permissive for a local operator UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    routes::build_routes()
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(bind: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("civic-serve listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
