//! Post endpoints (/schedule-post, /schedule-batch, /posts/*)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use libcivicast::scheduling::parse_timestamp;
use libcivicast::service::history::PostPage;
use libcivicast::service::orchestrator::{
    BatchSummary, DeleteOutcome, PostUpdate, ScheduleRequest, UpdateOutcome,
};
use libcivicast::{Platform, Post, PostQuery, PostStatus};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/schedule-post", post(schedule_post))
        .route("/schedule-batch", post(schedule_batch))
        .route("/posts", get(list_posts))
        .route(
            "/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
}

/// POST /schedule-post - Submit one manually composed post
async fn schedule_post(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state.service.orchestrator().schedule_post(request).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Deserialize)]
struct ScheduleBatchRequest {
    posts: Vec<ScheduleRequest>,
}

/// POST /schedule-batch - Submit several posts, one after another
async fn schedule_batch(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ScheduleBatchRequest>,
) -> ApiResult<Json<BatchSummary>> {
    if request.posts.is_empty() {
        return Err(ApiError::bad_request("Invalid input: posts must not be empty"));
    }
    let summary = state
        .service
        .orchestrator()
        .schedule_batch(request.posts)
        .await;
    Ok(Json(summary))
}

#[derive(Debug, Default, Deserialize)]
struct ListPostsQuery {
    /// Comma separated
    platforms: Option<String>,
    /// Comma separated
    statuses: Option<String>,
    search: Option<String>,
    /// RFC 3339
    start_date: Option<String>,
    /// RFC 3339
    end_date: Option<String>,
    article_id: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl ListPostsQuery {
    fn into_post_query(self, default_limit: usize) -> ApiResult<PostQuery> {
        let platforms = match self.platforms.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(list) => Platform::parse_list(list).map_err(ApiError::bad_request)?,
            None => Vec::new(),
        };
        let statuses = match self.statuses.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(list) => list
                .split(',')
                .map(|s| s.parse::<PostStatus>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(ApiError::bad_request)?,
            None => Vec::new(),
        };
        let since = self.start_date.as_deref().map(parse_timestamp).transpose()?;
        let until = self.end_date.as_deref().map(parse_timestamp).transpose()?;

        Ok(PostQuery {
            platforms,
            statuses,
            search: self.search,
            since,
            until,
            article_id: self.article_id,
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

/// GET /posts - Filtered, newest first, paginated
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<Json<PostPage>> {
    let page_size = state.service.config().server.page_size;
    let query = query.into_post_query(page_size)?;
    let page = state.service.history().list(query).await?;
    Ok(Json(page))
}

/// GET /posts/{id}
async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Post>> {
    Ok(Json(state.service.history().get(&id).await?))
}

/// PATCH /posts/{id} - Edit a post that is not yet published
async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<PostUpdate>,
) -> ApiResult<Json<UpdateOutcome>> {
    let outcome = state.service.orchestrator().update(&id, update).await?;
    Ok(Json(outcome))
}

/// DELETE /posts/{id} - Delete a post that is not yet published
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let outcome = state.service.orchestrator().delete(&id).await?;
    Ok(Json(outcome))
}
