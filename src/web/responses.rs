use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Serialize;

use crate::feedback::FeedbackError;

pub const SUBMISSION_FAILED: &str = "Entry submission failed.";

/// Canonical JSON payload for error responses.
#[derive(Debug, Serialize, Clone)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// Helper for controllers that need to return `(StatusCode, Json<ApiError>)`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError::new(message)))
}

pub fn bad_json(rejection: JsonRejection) -> (StatusCode, Json<ApiError>) {
    json_error(StatusCode::BAD_REQUEST, rejection.body_text())
}

pub fn feedback_status(err: &FeedbackError) -> StatusCode {
    match err {
        FeedbackError::Validation { .. } => StatusCode::BAD_REQUEST,
        FeedbackError::Aggregation { .. } => StatusCode::BAD_GATEWAY,
        FeedbackError::Transport { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Error surface of the feedback endpoint.
pub fn feedback_error(err: &FeedbackError) -> (StatusCode, Json<ApiError>) {
    json_error(feedback_status(err), err.to_string())
}

/// Error surface of entry submission: validation problems are explained,
/// everything else collapses into one generic failure.
pub fn submission_error(err: &FeedbackError) -> (StatusCode, Json<ApiError>) {
    match err {
        FeedbackError::Validation { reason } => json_error(StatusCode::BAD_REQUEST, reason.clone()),
        other => json_error(feedback_status(other), SUBMISSION_FAILED),
    }
}
