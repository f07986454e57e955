//! Stateless generation endpoint (/generate-variations)

use axum::{extract::State, routing::post, Json, Router};
use libcivicast::service::generation::GenerateParams;
use libcivicast::Variation;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/generate-variations", post(generate_variations))
}

#[derive(Serialize)]
struct GenerateResponse {
    variations: Vec<Variation>,
}

/// POST /generate-variations - One batch, nothing kept server side
async fn generate_variations(
    State(state): State<Arc<AppState>>,
    ApiJson(params): ApiJson<GenerateParams>,
) -> ApiResult<Json<GenerateResponse>> {
    let variations = state.service.generation().generate(params).await?;
    Ok(Json(GenerateResponse { variations }))
}
