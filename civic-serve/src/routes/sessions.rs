//! Curation session endpoints (/sessions/*)
//!
//! Sessions live in server memory only. Discarding one, or restarting the
//! server, has no external side effects.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use libcivicast::curation::VariationEdit;
use libcivicast::service::generation::GenerateParams;
use libcivicast::service::orchestrator::BatchSummary;
use libcivicast::service::SessionScheduleOptions;
use libcivicast::{CurationSession, Variation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/generate", post(generate_more))
        .route("/sessions/{id}/variations/{index}", patch(edit_variation))
        .route("/sessions/{id}/variations/{index}/toggle", post(toggle_variation))
        .route("/sessions/{id}/select-all", post(select_all))
        .route("/sessions/{id}/deselect-all", post(deselect_all))
        .route("/sessions/{id}/schedule", post(schedule_selection))
}

/// POST /sessions - Open a session with its first batch
async fn create_session(
    State(state): State<Arc<AppState>>,
    ApiJson(params): ApiJson<GenerateParams>,
) -> ApiResult<(StatusCode, Json<CurationSession>)> {
    let session = state.service.generation().start_session(params).await?;
    let snapshot = session.clone();
    state.insert_session(session).await;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /sessions/{id}
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CurationSession>> {
    let handle = state.session(&id).await?;
    let session = handle.lock().await;
    Ok(Json(session.clone()))
}

/// DELETE /sessions/{id}
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.remove_session(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Not found: session {}", id)))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateMoreRequest {
    posts_per_platform: Option<usize>,
    steering_prompt: Option<String>,
}

#[derive(Serialize)]
struct GenerateMoreResponse {
    /// Index of the first appended entry
    start: usize,
    /// One past the last appended entry
    end: usize,
    session: CurationSession,
}

/// POST /sessions/{id}/generate - Append another batch
async fn generate_more(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<GenerateMoreRequest>,
) -> ApiResult<Json<GenerateMoreResponse>> {
    let handle = state.session(&id).await?;
    let mut session = handle.lock().await;
    let range = state
        .service
        .generation()
        .generate_more(&mut session, request.posts_per_platform, request.steering_prompt)
        .await?;
    Ok(Json(GenerateMoreResponse {
        start: range.start,
        end: range.end,
        session: session.clone(),
    }))
}

/// PATCH /sessions/{id}/variations/{index}
async fn edit_variation(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
    ApiJson(edit): ApiJson<VariationEdit>,
) -> ApiResult<Json<Variation>> {
    let handle = state.session(&id).await?;
    let mut session = handle.lock().await;
    let variation = session.edit(index, edit)?;
    Ok(Json(variation.clone()))
}

#[derive(Serialize)]
struct ToggleResponse {
    index: usize,
    selected: bool,
}

/// POST /sessions/{id}/variations/{index}/toggle
async fn toggle_variation(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> ApiResult<Json<ToggleResponse>> {
    let handle = state.session(&id).await?;
    let selected = handle.lock().await.toggle_select(index)?;
    Ok(Json(ToggleResponse { index, selected }))
}

/// POST /sessions/{id}/select-all
async fn select_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CurationSession>> {
    let handle = state.session(&id).await?;
    let mut session = handle.lock().await;
    session.select_all();
    Ok(Json(session.clone()))
}

/// POST /sessions/{id}/deselect-all
async fn deselect_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CurationSession>> {
    let handle = state.session(&id).await?;
    let mut session = handle.lock().await;
    session.deselect_all();
    Ok(Json(session.clone()))
}

/// POST /sessions/{id}/schedule - Schedule the current selection
///
/// Always answers 200 with the aggregate summary once the batch ran; item
/// failures are reported inside it.
async fn schedule_selection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(options): ApiJson<SessionScheduleOptions>,
) -> ApiResult<Json<BatchSummary>> {
    let handle = state.session(&id).await?;
    let mut session = handle.lock().await;
    let summary = state
        .service
        .schedule_session(&mut session, options)
        .await?;
    Ok(Json(summary))
}
