use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::errors::{AppError, AppResult};
use crate::models::{CreateSubtaskPayload, MessageResponse, SubtaskRecord, ToggleSubtaskPayload};

use super::{require_session, required_field, AppState};

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateSubtaskPayload>,
) -> AppResult<impl IntoResponse> {
    let owner = require_session(&state, &headers)?;
    let text = required_field(payload.text, "Text and projectId are required")?;
    let project_id = required_field(payload.project_id, "Text and projectId are required")?;

    let subtask = state
        .db
        .add_subtask(&owner, &project_id, &text)?
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

pub(crate) async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ToggleSubtaskPayload>,
) -> AppResult<Json<SubtaskRecord>> {
    let owner = require_session(&state, &headers)?;
    let is_completed = payload
        .is_completed
        .ok_or_else(|| AppError::Validation("isCompleted is required".to_string()))?;

    let subtask = state
        .db
        .set_subtask_completed(&owner, &id, is_completed)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(subtask))
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<MessageResponse>> {
    let owner = require_session(&state, &headers)?;
    if !state.db.delete_subtask(&owner, &id)? {
        return Err(AppError::NotFound);
    }
    Ok(Json(MessageResponse::new("Subtask deleted")))
}
