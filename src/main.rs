use std::path::Path;
use std::sync::Arc;

use dayboard::config::Config;
use dayboard::db::Database;
use dayboard::server::{ApiServer, AppState};
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<()> {
    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "dayboard.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .json()
                .with_writer(non_blocking)
                .try_init()
                .map_err(|error| anyhow::anyhow!("tracing init failed: {error}"))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|error| anyhow::anyhow!("tracing init failed: {error}"))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_dir.as_deref())?;

    let db = Arc::new(Database::new(&config.db_path)?);
    tracing::info!(path = %config.db_path.display(), "database ready");

    tokio::spawn({
        let db = db.clone();
        async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match db.delete_expired_sessions() {
                    Ok(removed) if removed > 0 => {
                        tracing::debug!(removed, "expired sessions swept");
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(error = %error, "session sweep failed");
                    }
                }
            }
        }
    });

    let state = AppState {
        db,
        session_ttl_days: config.session_ttl_days,
        day_offset: config.day_offset,
    };
    let server = ApiServer::start(state, config.addr).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown();
    Ok(())
}
