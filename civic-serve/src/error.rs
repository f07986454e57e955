//! JSON error responses

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use libcivicast::error::MediaError;
use libcivicast::CivicastError;

/// An error rendered as `{"error": "<message>"}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn status_for(error: &CivicastError) -> StatusCode {
    match error {
        CivicastError::InvalidInput(_)
        | CivicastError::Immutable(_)
        | CivicastError::Media(MediaError::TooLarge { .. })
        | CivicastError::Media(MediaError::UnsupportedType(_)) => StatusCode::BAD_REQUEST,
        CivicastError::NotFound(_) => StatusCode::NOT_FOUND,
        CivicastError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CivicastError> for ApiError {
    fn from(error: CivicastError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", error);
        }
        Self::new(status, error.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// `Json` whose rejections use the same error body as every other failure
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
