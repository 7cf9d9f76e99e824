//! Schema bootstrap for the pipeline tables
//!
//! Stages are independently restartable, so every store creates its tables
//! on open; the statements are idempotent.

use sqlx::SqlitePool;

use crate::error::DataResult;

/// Create the id discovery table if it does not exist
pub(crate) async fn ensure_ids_table(pool: &SqlitePool) -> DataResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ids (
            id TEXT PRIMARY KEY,
            in_wikipedia INTEGER NOT NULL DEFAULT 0,
            is_property INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Create the language projection table if it does not exist
pub(crate) async fn ensure_entities_table(pool: &SqlitePool) -> DataResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS entities (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            description TEXT NOT NULL,
            aliases TEXT NOT NULL,
            claims TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Create an embedding cache table for `table_name` if it does not exist
///
/// The table name must already be validated; see `EmbedCache::open`.
pub(crate) async fn ensure_cache_table(pool: &SqlitePool, table_name: &str) -> DataResult<()> {
    let statement = format!(
        "CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY,
            embedding TEXT NOT NULL
        )"
    );
    sqlx::query(&statement).execute(pool).await?;
    Ok(())
}
