use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};

use crate::auth;
use crate::errors::{AppError, AppResult};
use crate::models::{CredentialsPayload, MessageResponse, UserResponse};

use super::AppState;

fn credentials(payload: CredentialsPayload) -> AppResult<(String, String)> {
    match (payload.email, payload.password) {
        (Some(email), Some(password))
            if !email.trim().is_empty() && !password.trim().is_empty() =>
        {
            Ok((email, password))
        }
        _ => Err(AppError::Validation(
            "Email and password are required.".to_string(),
        )),
    }
}

fn set_cookie(response: &mut Response, cookie: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| AppError::Internal("session cookie not header-safe".to_string()))?;
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(())
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> AppResult<impl IntoResponse> {
    let (email, password) = credentials(payload)?;
    let user = state.db.create_user(&email, &auth::hash_password(&password))?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> AppResult<Response> {
    let (email, password) = credentials(payload)?;

    // One generic 401 for unknown email and wrong password alike.
    let Some((user, stored_hash)) = state.db.user_credentials(&email)? else {
        return Err(AppError::Unauthorized);
    };
    if !auth::verify_password(&password, &stored_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = auth::generate_token();
    let expires_at = Utc::now() + Duration::days(state.session_ttl_days);
    state
        .db
        .create_session(&auth::hash_token(&token), &user.id, expires_at)?;

    let max_age = state.session_ttl_days * 24 * 60 * 60;
    let mut response = Json(UserResponse { user }).into_response();
    set_cookie(&mut response, &auth::build_session_cookie(&token, max_age))?;
    Ok(response)
}

pub(crate) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let token = auth::session_cookie_from(&headers).ok_or(AppError::Unauthorized)?;
    let token_hash = auth::hash_token(&token);
    if state.db.session_user(&token_hash)?.is_none() {
        return Err(AppError::Unauthorized);
    }
    state.db.delete_session(&token_hash)?;

    let mut response = Json(MessageResponse::new("Logged out")).into_response();
    set_cookie(&mut response, &auth::expired_session_cookie())?;
    Ok(response)
}
