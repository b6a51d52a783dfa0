use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use chrono::FixedOffset;

/// Server settings, read once at startup from `DAYBOARD_*` environment
/// variables. Every knob has a default so a bare `dayboard` invocation works.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub session_ttl_days: i64,
    pub day_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let addr = parse_addr(std::env::var("DAYBOARD_ADDR").ok())?;
        let db_path = std::env::var("DAYBOARD_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("dayboard.sqlite3"));
        let log_dir = std::env::var("DAYBOARD_LOG_DIR").ok().map(PathBuf::from);
        let session_ttl_days = parse_ttl_days(std::env::var("DAYBOARD_SESSION_TTL_DAYS").ok())?;
        let day_offset = parse_day_offset(std::env::var("DAYBOARD_DAY_OFFSET").ok())?;
        Ok(Self {
            addr,
            db_path,
            log_dir,
            session_ttl_days,
            day_offset,
        })
    }
}

fn parse_addr(raw: Option<String>) -> anyhow::Result<SocketAddr> {
    match raw {
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid DAYBOARD_ADDR '{value}'")),
        None => Ok(SocketAddr::from(([127, 0, 0, 1], 8080))),
    }
}

fn parse_ttl_days(raw: Option<String>) -> anyhow::Result<i64> {
    match raw {
        Some(value) => {
            let days: i64 = value
                .parse()
                .with_context(|| format!("invalid DAYBOARD_SESSION_TTL_DAYS '{value}'"))?;
            if days <= 0 {
                anyhow::bail!("DAYBOARD_SESSION_TTL_DAYS must be positive, got {days}");
            }
            Ok(days)
        }
        None => Ok(30),
    }
}

fn parse_day_offset(raw: Option<String>) -> anyhow::Result<FixedOffset> {
    match raw {
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid DAYBOARD_DAY_OFFSET '{value}', expected e.g. +01:00")),
        None => Ok(FixedOffset::east_opt(3600).expect("static offset")),
    }
}
