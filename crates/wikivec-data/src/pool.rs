//! SQLite connection pool construction
//!
//! The id and entity tables live in one language-scoped file owned by the
//! stage writing it; the embedding cache lives in its own shared file. WAL
//! keeps concurrent readers cheap while writes stay serialized.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::error::{DataError, DataResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Open (creating if missing) a read-write pool over a database file
///
/// # Errors
///
/// Returns a storage error if the file cannot be created or opened.
pub async fn connect(path: &Path) -> DataResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(10));

    SqlitePoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|e| DataError::Storage(format!("cannot open {}: {e}", path.display())))
}

/// Open an existing database file read-only
///
/// # Errors
///
/// Returns a storage error if the file does not exist or cannot be opened.
pub async fn connect_read_only(path: &Path) -> DataResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));

    SqlitePoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|e| DataError::Storage(format!("cannot open {} read-only: {e}", path.display())))
}

/// Open an in-memory database (tests and scratch runs)
///
/// A single pinned connection keeps the in-memory database alive for the
/// pool's lifetime.
///
/// # Errors
///
/// Returns a storage error if the connection cannot be established.
pub async fn connect_memory() -> DataResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DataError::Storage(e.to_string()))?;

    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| DataError::Storage(format!("cannot open in-memory database: {e}")))
}
