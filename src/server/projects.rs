use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::errors::{AppError, AppResult};
use crate::models::{
    parse_bool_filter, CreateProjectPayload, ProjectListQuery, ProjectRecord, SuggestResponse,
    UpdateProjectPayload,
};
use crate::suggest::suggest;

use super::{require_session, required_field, AppState};

/// Active projects only; `?done=true|false` narrows further.
pub(crate) async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProjectListQuery>,
) -> AppResult<Json<Vec<ProjectRecord>>> {
    let owner = require_session(&state, &headers)?;
    let done = parse_bool_filter(query.done.as_deref());
    Ok(Json(state.db.list_projects(&owner, done)?))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateProjectPayload>,
) -> AppResult<impl IntoResponse> {
    let owner = require_session(&state, &headers)?;
    let title = required_field(payload.title, "Title is required")?;
    let project = state
        .db
        .create_project(&owner, &title, payload.description.as_deref())?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub(crate) async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ProjectRecord>> {
    let owner = require_session(&state, &headers)?;
    let project = state
        .db
        .get_project(&owner, &id)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(project))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProjectPayload>,
) -> AppResult<Json<ProjectRecord>> {
    let owner = require_session(&state, &headers)?;
    let project = state
        .db
        .update_project(&owner, &id, &payload)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(project))
}

/// DELETE on a project soft-archives it; hard deletion goes through the
/// archive endpoints.
pub(crate) async fn archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ProjectRecord>> {
    let owner = require_session(&state, &headers)?;
    let project = state
        .db
        .archive_project(&owner, &id)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(project))
}

pub(crate) async fn suggest_subtasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let owner = require_session(&state, &headers)?;
    let title = state
        .db
        .project_title(&owner, &id)?
        .ok_or(AppError::NotFound)?;

    let suggestions = suggest(&title);
    let count = state
        .db
        .add_subtasks_bulk(&owner, &id, &suggestions)?
        .ok_or(AppError::NotFound)?;

    Ok((
        StatusCode::CREATED,
        Json(SuggestResponse {
            message: "Subtasks added!".to_string(),
            count,
        }),
    ))
}
