use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;

use crate::db::day_window;
use crate::errors::{AppError, AppResult};
use crate::models::{
    parse_bool_filter, DailyCompletionPayload, DailyListQuery, DailyTaskRecord,
    DailyTemplateRecord, IdPayload, MessageResponse, TitlePayload,
};

use super::{require_session, required_field, AppState};

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format".to_string()))
}

/// Templates with the completion flag derived for the requested day.
pub(crate) async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DailyListQuery>,
) -> AppResult<Json<Vec<DailyTaskRecord>>> {
    let owner = require_session(&state, &headers)?;
    let raw_date = query
        .date
        .ok_or_else(|| AppError::Validation("Date parameter is required".to_string()))?;
    let window = day_window(state.day_offset, parse_date(&raw_date)?);
    let archived = parse_bool_filter(query.is_archived.as_deref());
    Ok(Json(state.db.list_daily(&owner, window, archived)?))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TitlePayload>,
) -> AppResult<impl IntoResponse> {
    let owner = require_session(&state, &headers)?;
    let title = required_field(payload.title, "Title is required")?;
    let template = state.db.create_daily_template(&owner, &title)?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// Completing an already-completed day is a 201 no-op; no duplicate row is
/// written.
pub(crate) async fn complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DailyCompletionPayload>,
) -> AppResult<impl IntoResponse> {
    let owner = require_session(&state, &headers)?;
    let template_id = required_field(payload.template_id, "Missing parameters")?;
    let raw_date = required_field(payload.date, "Missing parameters")?;
    let window = day_window(state.day_offset, parse_date(&raw_date)?);

    state
        .db
        .complete_daily(&owner, &template_id, window)?
        .ok_or(AppError::NotFound)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Task completed")),
    ))
}

/// Unmarking a day that was never completed still succeeds.
pub(crate) async fn uncomplete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DailyCompletionPayload>,
) -> AppResult<Json<MessageResponse>> {
    let owner = require_session(&state, &headers)?;
    let template_id = required_field(payload.template_id, "Missing parameters")?;
    let raw_date = required_field(payload.date, "Missing parameters")?;
    let window = day_window(state.day_offset, parse_date(&raw_date)?);

    state.db.uncomplete_daily(&owner, &template_id, window)?;
    Ok(Json(MessageResponse::new("Task completion removed")))
}

pub(crate) async fn archive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> AppResult<Json<DailyTemplateRecord>> {
    let owner = require_session(&state, &headers)?;
    let id = required_field(payload.id, "Daily task ID is required")?;
    let template = state
        .db
        .set_daily_template_archived(&owner, &id, true)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(template))
}

pub(crate) async fn restore(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> AppResult<Json<DailyTemplateRecord>> {
    let owner = require_session(&state, &headers)?;
    let id = required_field(payload.id, "Daily task ID is required")?;
    let template = state
        .db
        .set_daily_template_archived(&owner, &id, false)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(template))
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> AppResult<Json<MessageResponse>> {
    let owner = require_session(&state, &headers)?;
    let id = required_field(payload.id, "Daily task ID is required")?;
    if !state.db.delete_daily_template(&owner, &id)? {
        return Err(AppError::NotFound);
    }
    Ok(Json(MessageResponse::new("Daily task permanently deleted")))
}
