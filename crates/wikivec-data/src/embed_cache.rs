//! Embedding cache store
//!
//! Caches embedding vectors under a caller-chosen namespace so re-runs and
//! evaluations never pay for the same embedding twice. Vectors are stored as
//! Base64-encoded little-endian f32 bytes; a stored value always decodes to
//! a whole number of floats.
//!
//! Key semantics are per namespace: the document-shipping namespace keys by
//! document id, the query cache keys by the query text itself.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{DataError, DataResult};
use crate::migrations;

// 2 binds per row.
const INSERT_CHUNK_ROWS: usize = 450;
const SELECT_CHUNK_IDS: usize = 900;

/// Shared, read-heavy cache of embedding vectors
#[derive(Clone)]
pub struct EmbedCache {
    pool: SqlitePool,
    table: String,
}

impl EmbedCache {
    /// Open the cache for `namespace` over `pool`, creating its table if
    /// needed
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidIdentifier`] when the namespace is not a
    /// plain identifier, or a storage error if the table cannot be created.
    pub async fn open(pool: SqlitePool, namespace: &str) -> DataResult<Self> {
        validate_namespace(namespace)?;
        let table = format!("embeddings_{namespace}");
        migrations::ensure_cache_table(&pool, &table).await?;
        Ok(Self { pool, table })
    }

    /// Fetch one cached vector
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails or a parse error if the
    /// stored value is corrupt.
    pub async fn get(&self, id: &str) -> DataResult<Option<Vec<f32>>> {
        let statement = format!("SELECT embedding FROM {} WHERE id = ?", self.table);
        let row: Option<(String,)> = sqlx::query_as(&statement)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(encoded,)| decode_embedding(&encoded)).transpose()
    }

    /// Fetch many cached vectors, keyed by id; misses are simply absent
    ///
    /// # Errors
    ///
    /// Returns a storage or parse error.
    pub async fn get_many(&self, ids: &[&str]) -> DataResult<HashMap<String, Vec<f32>>> {
        let mut found = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(SELECT_CHUNK_IDS) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("SELECT id, embedding FROM {} WHERE id IN (", self.table));
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            builder.push(")");
            let rows: Vec<(String, String)> =
                builder.build_query_as().fetch_all(&self.pool).await?;
            for (id, encoded) in rows {
                found.insert(id, decode_embedding(&encoded)?);
            }
        }
        Ok(found)
    }

    /// Bulk insert with conflict-ignore semantics, all-or-nothing
    ///
    /// # Errors
    ///
    /// Returns a storage error; no partial batch is visible afterwards.
    pub async fn bulk_put(&self, entries: &[(String, Vec<f32>)]) -> DataResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let encoded: Vec<(&String, String)> = entries
            .iter()
            .map(|(id, vector)| (id, encode_embedding(vector)))
            .collect();

        let mut tx = self.pool.begin().await?;
        for chunk in encoded.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("INSERT INTO {} (id, embedding) ", self.table));
            builder.push_values(chunk, |mut row, (id, embedding)| {
                row.push_bind(*id).push_bind(embedding);
            });
            builder.push(" ON CONFLICT(id) DO NOTHING");
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Number of cached vectors
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn count(&self) -> DataResult<i64> {
        let statement = format!("SELECT COUNT(*) FROM {}", self.table);
        let row: (i64,) = sqlx::query_as(&statement).fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    /// Fetch up to `limit` entries with id greater than `cursor`, in id
    /// order
    ///
    /// # Errors
    ///
    /// Returns a storage or parse error.
    pub async fn scan_after(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> DataResult<Vec<(String, Vec<f32>)>> {
        let statement = format!(
            "SELECT id, embedding FROM {} WHERE id > ? ORDER BY id LIMIT ?",
            self.table
        );
        let rows: Vec<(String, String)> = sqlx::query_as(&statement)
            .bind(cursor.unwrap_or(""))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|(id, encoded)| Ok((id, decode_embedding(&encoded)?)))
            .collect()
    }

    /// Stream every cached entry in id order
    pub fn stream(
        &self,
        page_size: usize,
    ) -> impl futures::Stream<Item = DataResult<(String, Vec<f32>)>> + Send {
        use futures::TryStreamExt;

        let cache = self.clone();
        let page_size = page_size.max(1);
        futures::stream::try_unfold(None::<String>, move |cursor| {
            let cache = cache.clone();
            async move {
                let page = cache.scan_after(cursor.as_deref(), page_size).await?;
                if page.is_empty() {
                    return Ok::<_, DataError>(None);
                }
                let next = page.last().map(|(id, _)| id.clone());
                let items = futures::stream::iter(page.into_iter().map(Ok::<_, DataError>));
                Ok(Some((items, next)))
            }
        })
        .try_flatten()
    }
}

/// Namespaces become table names, so only plain identifiers are accepted
fn validate_namespace(namespace: &str) -> DataResult<()> {
    let valid = !namespace.is_empty()
        && !namespace.starts_with(|c: char| c.is_ascii_digit())
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DataError::InvalidIdentifier(format!(
            "cache namespace '{namespace}' must be a plain identifier"
        )))
    }
}

/// Encode a vector as Base64 over little-endian f32 bytes
pub fn encode_embedding(vector: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Decode a Base64 string back into an f32 vector
///
/// # Errors
///
/// Returns a parse error when the payload is not Base64 or its length is not
/// a multiple of four bytes.
pub fn decode_embedding(encoded: &str) -> DataResult<Vec<f32>> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| DataError::Parse(format!("embedding is not valid Base64: {e}")))?;
    if bytes.len() % 4 != 0 {
        return Err(DataError::Parse(format!(
            "embedding byte length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
