//! Read-only endpoints (/stats, /profiles)

use axum::{extract::State, routing::get, Json, Router};
use libcivicast::db::PostStats;
use libcivicast::error::CivicastError;
use libcivicast::PlatformAccount;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(stats))
        .route("/profiles", get(profiles))
}

/// GET /stats - Totals by status and platform
async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<PostStats>> {
    Ok(Json(state.service.history().stats().await?))
}

#[derive(Serialize)]
struct ProfilesResponse {
    profiles: Vec<PlatformAccount>,
}

/// GET /profiles - Accounts connected at the scheduling provider
async fn profiles(State(state): State<Arc<AppState>>) -> ApiResult<Json<ProfilesResponse>> {
    let profiles = state
        .service
        .orchestrator()
        .registry()
        .list()
        .await
        .map_err(CivicastError::from)?;
    Ok(Json(ProfilesResponse { profiles }))
}
