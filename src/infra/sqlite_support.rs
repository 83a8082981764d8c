// Shared SQLite plumbing for the feed and audit stores.

use crate::core::errors::StoreError;
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

// SQLite result codes that clear up on their own: BUSY, LOCKED and their
// extended variants (BUSY_RECOVERY, LOCKED_SHAREDCACHE, BUSY_SNAPSHOT).
const RETRYABLE_SQLITE_CODES: [&str; 5] = ["5", "6", "261", "262", "517"];

/// Open a connection pool, creating the database file if needed.
pub async fn connect(database_url: &str) -> anyhow::Result<Pool<Sqlite>> {
    let in_memory = database_url.contains(":memory:");

    // Ensure the file exists if it's a file path
    let path_str = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if !in_memory && !Path::new(path_str).exists() {
        if let Some(parent) = Path::new(path_str).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        std::fs::File::create(path_str)
            .with_context(|| format!("failed to create database file {}", path_str))?;
    }

    let conn_str = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}", database_url)
    };

    // Every pooled connection to :memory: would get its own empty database.
    let max_connections = if in_memory { 1 } else { 5 };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&conn_str)
        .await
        .with_context(|| format!("failed to open SQLite database at {}", database_url))
}

/// Sort transient driver failures from permanent ones.
pub fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_) => StoreError::Transient(err.to_string()),
        sqlx::Error::Database(db) => {
            let retryable = db
                .code()
                .as_deref()
                .map(|code| RETRYABLE_SQLITE_CODES.contains(&code))
                .unwrap_or(false);
            if retryable {
                StoreError::Transient(err.to_string())
            } else {
                StoreError::Permanent(err.to_string())
            }
        }
        _ => StoreError::Permanent(err.to_string()),
    }
}

/// Fixed-width RFC 3339 with microseconds, so text order equals time order.
pub fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Permanent(format!("unreadable timestamp '{}': {}", raw, e)))
}

/// Drop sub-microsecond precision so returned values match what was stored.
pub fn truncate_to_micros(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(timestamp.timestamp_micros()).unwrap_or(timestamp)
}
