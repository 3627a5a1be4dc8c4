use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::{
    journal::{AttachmentRef, EntryDraft, EntryType, JournalEntry, TimelineSnapshot, parse_entry_date},
    web::{
        AppState,
        responses::{ApiResult, bad_json, json_error, submission_error},
    },
};

#[derive(Debug, Deserialize)]
pub struct SubmitEntryRequest {
    #[serde(default)]
    content: String,
    #[serde(rename = "type", default)]
    entry_type: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    attachment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectDateRequest {
    date: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    /// Absent means toggle.
    #[serde(default)]
    show: Option<bool>,
}

fn parse_stamp(raw: &str) -> ApiResult<NaiveDateTime> {
    parse_entry_date(raw)
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, format!("unrecognized date: {raw}")))
}

fn parse_day(raw: &str) -> ApiResult<NaiveDate> {
    parse_stamp(raw).map(|stamp| stamp.date())
}

pub async fn submit_entry(
    State(state): State<AppState>,
    payload: Result<Json<SubmitEntryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JournalEntry>)> {
    let Json(request) = payload.map_err(bad_json)?;

    let entry_type = match request.entry_type.as_deref() {
        Some(raw) => raw
            .parse::<EntryType>()
            .map_err(|err| json_error(StatusCode::BAD_REQUEST, err.to_string()))?,
        None => EntryType::default(),
    };
    let date = match request.date.as_deref() {
        Some(raw) => parse_stamp(raw)?,
        None => Local::now().naive_local(),
    };

    let mut draft =
        EntryDraft::new(request.content, entry_type, date).map_err(|err| submission_error(&err))?;
    if let Some(reference) = request.attachment.filter(|r| !r.trim().is_empty()) {
        draft = draft.with_attachment(AttachmentRef::new(reference));
    }

    let entry = state
        .timeline()
        .submit(state.timeline_client(), draft)
        .await
        .map_err(|err| submission_error(&err))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<Vec<JournalEntry>>> {
    let timeline = state.timeline().lock().await;
    let day = match query.date.as_deref() {
        Some(raw) => parse_day(raw)?,
        None => timeline.selected_date(),
    };

    Ok(Json(timeline.entries_on(day).into_iter().cloned().collect()))
}

pub async fn timeline_snapshot(State(state): State<AppState>) -> Json<TimelineSnapshot> {
    Json(state.timeline().lock().await.snapshot())
}

pub async fn select_date(
    State(state): State<AppState>,
    payload: Result<Json<SelectDateRequest>, JsonRejection>,
) -> ApiResult<Json<TimelineSnapshot>> {
    let Json(request) = payload.map_err(bad_json)?;
    let day = parse_day(&request.date)?;

    let mut timeline = state.timeline().lock().await;
    timeline.select_date(day);
    Ok(Json(timeline.snapshot()))
}

pub async fn set_history(
    State(state): State<AppState>,
    payload: Result<Json<HistoryRequest>, JsonRejection>,
) -> ApiResult<Json<TimelineSnapshot>> {
    let Json(request) = payload.map_err(bad_json)?;

    let mut timeline = state.timeline().lock().await;
    match request.show {
        Some(show) => timeline.set_history_visible(show),
        None => {
            timeline.toggle_history();
        }
    }
    Ok(Json(timeline.snapshot()))
}
