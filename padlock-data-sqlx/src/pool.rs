use crate::error::{SqlxErrorExt, SqlxResult};
use padlock_core::{PadlockConfig, PadlockError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Create a SQLite pool from the `padlock` configuration section.
///
/// Foreign keys are enforced on every connection and the database file is
/// created if missing.
///
/// # Errors
/// Returns `PadlockError::InvalidConfig` if `database_url` is missing or
/// malformed, and `PadlockError::Database` if connecting fails.
pub async fn create_pool(config: &PadlockConfig) -> SqlxResult<SqlitePool> {
    config.validate()?;
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| PadlockError::InvalidConfig("database_url is required".into()))?;

    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| PadlockError::InvalidConfig(format!("invalid database_url: {e}")))?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)?;

    tracing::debug!(max_connections = config.max_connections, "role store pool created");
    Ok(pool)
}

/// Single-connection in-memory pool, for tests and ephemeral use.
///
/// The connection is never recycled, so the database lives as long as the
/// pool.
pub async fn memory_pool() -> SqlxResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(SqlxErrorExt::into_padlock_error)?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(SqlxErrorExt::into_padlock_error)
}
