use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::{
    feedback::{FeedbackRequest, FeedbackResponse},
    web::{
        AppState,
        responses::{ApiResult, bad_json, feedback_error},
    },
};

pub async fn generate_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult<Json<FeedbackResponse>> {
    let Json(request) = payload.map_err(bad_json)?;

    state
        .feedback_service()
        .handle(request)
        .await
        .map(Json)
        .map_err(|err| feedback_error(&err))
}
