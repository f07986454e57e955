//! Media upload endpoint (/media)

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use libcivicast::media::StoredMedia;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/media", post(upload_media))
}

/// POST /media - Store the raw request body and return its public URL
///
/// The body is the file itself; `Content-Type` names its type.
async fn upload_media(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<StoredMedia>)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Invalid input: Content-Type header is required"))?;

    if body.is_empty() {
        return Err(ApiError::bad_request("Invalid input: empty upload"));
    }

    let stored = state.service.media().store(content_type, &body).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
