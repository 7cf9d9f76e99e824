//! Id discovery store
//!
//! One row per known identifier. Upserts are monotone-OR on both boolean
//! flags: an id first seen as a claim reference can later be promoted when
//! the entity itself is scanned, but a raised flag is never lowered.

use futures::stream::{Stream, TryStreamExt};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{DataError, DataResult};
use crate::migrations;
use crate::models::IdRecord;

// 3 binds per row, comfortably under SQLite's bind limit per statement.
const UPSERT_CHUNK_ROWS: usize = 300;
const SELECT_CHUNK_IDS: usize = 900;

/// Store of discovered identifiers and their flags
#[derive(Clone)]
pub struct IdStore {
    pool: SqlitePool,
}

impl IdStore {
    /// Open the store over `pool`, creating its table if needed
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be created.
    pub async fn open(pool: SqlitePool) -> DataResult<Self> {
        migrations::ensure_ids_table(&pool).await?;
        Ok(Self { pool })
    }

    /// Bulk upsert with monotone-OR conflict resolution, all-or-nothing
    ///
    /// # Errors
    ///
    /// Returns a storage error if the transaction fails; no partial batch is
    /// visible afterwards.
    pub async fn bulk_upsert(&self, records: &[IdRecord]) -> DataResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for chunk in records.chunks(UPSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO ids (id, in_wikipedia, is_property) ");
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(&record.id)
                    .push_bind(record.in_wikipedia)
                    .push_bind(record.is_property);
            });
            builder.push(
                " ON CONFLICT(id) DO UPDATE SET \
                 in_wikipedia = max(ids.in_wikipedia, excluded.in_wikipedia), \
                 is_property = max(ids.is_property, excluded.is_property)",
            );
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Fetch one record by id
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn get(&self, id: &str) -> DataResult<Option<IdRecord>> {
        let record = sqlx::query_as("SELECT id, in_wikipedia, is_property FROM ids WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Fetch many records by id; absent ids are simply missing from the
    /// result
    ///
    /// # Errors
    ///
    /// Returns a storage error if a query fails.
    pub async fn get_many(&self, ids: &[&str]) -> DataResult<Vec<IdRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(SELECT_CHUNK_IDS) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT id, in_wikipedia, is_property FROM ids WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            builder.push(")");
            let mut found = builder.build_query_as::<IdRecord>().fetch_all(&self.pool).await?;
            records.append(&mut found);
        }
        Ok(records)
    }

    /// Whether the id has been discovered
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn contains(&self, id: &str) -> DataResult<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Total number of discovered ids
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn count(&self) -> DataResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ids")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Fetch up to `limit` records with id greater than `cursor`, in id order
    ///
    /// Keyset pagination primitive backing [`Self::stream`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn scan_after(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> DataResult<Vec<IdRecord>> {
        let records = sqlx::query_as(
            "SELECT id, in_wikipedia, is_property FROM ids \
             WHERE id > ? ORDER BY id LIMIT ?",
        )
        .bind(cursor.unwrap_or(""))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Stream every record in id order, fetching `page_size` rows at a time
    pub fn stream(&self, page_size: usize) -> impl Stream<Item = DataResult<IdRecord>> + Send {
        let store = self.clone();
        let page_size = page_size.max(1);
        futures::stream::try_unfold(None::<String>, move |cursor| {
            let store = store.clone();
            async move {
                let page = store.scan_after(cursor.as_deref(), page_size).await?;
                if page.is_empty() {
                    return Ok::<_, DataError>(None);
                }
                let next = page.last().map(|record| record.id.clone());
                let items = futures::stream::iter(page.into_iter().map(Ok::<_, DataError>));
                Ok(Some((items, next)))
            }
        })
        .try_flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect_memory;

    async fn store() -> IdStore {
        let pool = connect_memory().await.expect("pool");
        IdStore::open(pool).await.expect("store")
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = store().await;
        store
            .bulk_upsert(&[IdRecord::new("Q1", true, false)])
            .await
            .expect("upsert");
        let record = store.get("Q1").await.expect("get").expect("present");
        assert!(record.in_wikipedia);
        assert!(!record.is_property);
        assert!(store.get("Q2").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn flags_are_monotone_under_any_order() {
        let store = store().await;
        store
            .bulk_upsert(&[
                IdRecord::new("P31", false, true),
                IdRecord::new("P31", false, false),
            ])
            .await
            .expect("upsert");
        store
            .bulk_upsert(&[IdRecord::new("P31", true, false)])
            .await
            .expect("upsert");
        store
            .bulk_upsert(&[IdRecord::new("P31", false, false)])
            .await
            .expect("upsert");

        let record = store.get("P31").await.expect("get").expect("present");
        assert!(record.in_wikipedia, "true observation must stick");
        assert!(record.is_property, "true observation must stick");
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let store = store().await;
        let batch = vec![
            IdRecord::new("Q1", true, false),
            IdRecord::new("P31", false, true),
            IdRecord::new("Q7", false, false),
        ];
        store.bulk_upsert(&batch).await.expect("first pass");
        store.bulk_upsert(&batch).await.expect("second pass");
        assert_eq!(store.count().await.expect("count"), 3);
    }

    #[tokio::test]
    async fn get_many_returns_only_present_ids() {
        let store = store().await;
        store
            .bulk_upsert(&[
                IdRecord::new("Q1", false, false),
                IdRecord::new("Q2", false, false),
            ])
            .await
            .expect("upsert");
        let records = store
            .get_many(&["Q1", "Q2", "Q404"])
            .await
            .expect("get_many");
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn stream_visits_every_record_in_order() {
        let store = store().await;
        let batch: Vec<IdRecord> = (0..25)
            .map(|i| IdRecord::new(format!("Q{i:03}"), false, false))
            .collect();
        store.bulk_upsert(&batch).await.expect("upsert");

        let ids: Vec<String> = store
            .stream(7)
            .map_ok(|record| record.id)
            .try_collect()
            .await
            .expect("stream");
        assert_eq!(ids.len(), 25);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn large_batches_are_chunked() {
        let store = store().await;
        let batch: Vec<IdRecord> = (0..UPSERT_CHUNK_ROWS + 13)
            .map(|i| IdRecord::new(format!("Q{i}"), i % 2 == 0, false))
            .collect();
        store.bulk_upsert(&batch).await.expect("upsert");
        assert_eq!(
            store.count().await.expect("count"),
            (UPSERT_CHUNK_ROWS + 13) as i64
        );
    }
}
