pub mod generate;
pub mod health;
pub mod media;
pub mod posts;
pub mod sessions;
pub mod stats;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .merge(generate::routes())
        .merge(sessions::routes())
        .merge(posts::routes())
        .merge(stats::routes())
        .merge(media::routes())
}
