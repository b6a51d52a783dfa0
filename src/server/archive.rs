use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::errors::{AppError, AppResult};
use crate::models::{IdPayload, MessageResponse, ProjectRecord};

use super::{require_session, required_field, AppState};

/// Archived projects, most recently touched first.
pub(crate) async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<ProjectRecord>>> {
    let owner = require_session(&state, &headers)?;
    Ok(Json(state.db.list_archived_projects(&owner)?))
}

/// Restore clears both the archived and done flags so the project lands
/// back in the active list.
pub(crate) async fn restore(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> AppResult<Json<MessageResponse>> {
    let owner = require_session(&state, &headers)?;
    let id = required_field(payload.id, "Project ID is required")?;
    if !state.db.restore_project(&owner, &id)? {
        return Err(AppError::NotFound);
    }
    Ok(Json(MessageResponse::new("Project restored")))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> AppResult<Json<MessageResponse>> {
    let owner = require_session(&state, &headers)?;
    let id = required_field(payload.id, "Project ID is required")?;
    if !state.db.delete_project_permanently(&owner, &id)? {
        return Err(AppError::NotFound);
    }
    Ok(Json(MessageResponse::new("Project permanently deleted")))
}
