use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::errors::{AppError, AppResult};
use crate::models::{
    parse_bool_filter, IdPayload, MessageResponse, TitlePayload, WeeklyCompletionPayload,
    WeeklyListQuery, WeeklyTaskRecord,
};

use super::{require_session, required_field, AppState};

pub(crate) async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WeeklyListQuery>,
) -> AppResult<Json<Vec<WeeklyTaskRecord>>> {
    let owner = require_session(&state, &headers)?;
    let archived = parse_bool_filter(query.is_archived.as_deref());
    Ok(Json(state.db.list_weekly(&owner, archived)?))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TitlePayload>,
) -> AppResult<impl IntoResponse> {
    let owner = require_session(&state, &headers)?;
    let title = required_field(payload.title, "Title is required")?;
    let task = state.db.create_weekly_task(&owner, &title)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Appends a completion stamped now; the latest row becomes the task's
/// `lastCompletedAt`.
pub(crate) async fn complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WeeklyCompletionPayload>,
) -> AppResult<impl IntoResponse> {
    let owner = require_session(&state, &headers)?;
    let task_id = required_field(payload.task_id, "Task ID is required")?;
    let completion = state
        .db
        .complete_weekly(&owner, &task_id)?
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(completion)))
}

pub(crate) async fn archive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> AppResult<Json<WeeklyTaskRecord>> {
    let owner = require_session(&state, &headers)?;
    let id = required_field(payload.id, "Weekly task ID is required")?;
    let task = state
        .db
        .archive_weekly_task(&owner, &id)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> AppResult<Json<MessageResponse>> {
    let owner = require_session(&state, &headers)?;
    let id = required_field(payload.id, "Weekly task ID is required")?;
    if !state.db.delete_weekly_task(&owner, &id)? {
        return Err(AppError::NotFound);
    }
    Ok(Json(MessageResponse::new(
        "Weekly task permanently deleted",
    )))
}
