use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use chrono::FixedOffset;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::auth;
use crate::db::Database;
use crate::errors::{AppError, AppResult};

mod account;
mod archive;
mod daily;
mod projects;
mod subtasks;
mod weekly;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub session_ttl_days: i64,
    pub day_offset: FixedOffset,
}

/// Resolves the session cookie to a user id. Anything short of a live,
/// owned session is a 401; handlers call this before touching data.
pub(crate) fn require_session(state: &AppState, headers: &HeaderMap) -> AppResult<String> {
    let token = auth::session_cookie_from(headers).ok_or(AppError::Unauthorized)?;
    state
        .db
        .session_user(&auth::hash_token(&token))?
        .ok_or(AppError::Unauthorized)
}

pub(crate) fn required_field(value: Option<String>, message: &str) -> AppResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Validation(message.to_string())),
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/register", post(account::register))
        .route("/api/login", post(account::login))
        .route("/api/logout", post(account::logout))
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/{id}",
            get(projects::get_one)
                .patch(projects::update)
                .delete(projects::archive),
        )
        .route(
            "/api/projects/{id}/suggest-subtasks",
            post(projects::suggest_subtasks),
        )
        .route("/api/subtasks", post(subtasks::create))
        .route(
            "/api/subtasks/{id}",
            put(subtasks::toggle).delete(subtasks::remove),
        )
        .route("/api/archive", get(archive::list))
        .route("/api/archive/restore", post(archive::restore))
        .route("/api/archive/delete", post(archive::delete))
        .route("/api/daily-tasks", get(daily::list).post(daily::create))
        .route(
            "/api/daily-tasks/completion",
            post(daily::complete).delete(daily::uncomplete),
        )
        .route("/api/daily-tasks/archive", patch(daily::archive))
        .route("/api/daily-tasks/restore", patch(daily::restore))
        .route("/api/daily-tasks/delete", delete(daily::remove))
        .route("/api/weekly-tasks", get(weekly::list).post(weekly::create))
        .route("/api/weekly-tasks/completion", post(weekly::complete))
        .route("/api/weekly-tasks/archive", patch(weekly::archive))
        .route("/api/weekly-tasks/delete", delete(weekly::remove))
        .with_state(state)
}

/// REST server over the dashboard state.
///
/// Binds the configured address (use port `0` for auto-assign) and serves
/// in a background tokio task.
pub struct ApiServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ApiServer {
    pub async fn start(state: AppState, addr: SocketAddr) -> AppResult<Self> {
        let app = router(state);
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        tracing::info!(%addr, "api server listening");

        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!(error = %error, "api server failed");
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
