//! Language projection store
//!
//! One row per identifier for one target language. Rows are written exactly
//! once: a second insert for the same id is ignored, so stage B can be
//! replayed safely. The textifier resolves labels through this store.

use futures::stream::{Stream, TryStreamExt};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteRow};

use crate::error::{DataError, DataResult};
use crate::migrations;
use crate::models::{ClaimMap, LangEntity};

// 5 binds per row.
const INSERT_CHUNK_ROWS: usize = 180;
const SELECT_CHUNK_IDS: usize = 900;

/// Store of language-projected entities
#[derive(Clone)]
pub struct LangStore {
    pool: SqlitePool,
}

impl LangStore {
    /// Open the store over `pool`, creating its table if needed
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be created.
    pub async fn open(pool: SqlitePool) -> DataResult<Self> {
        migrations::ensure_entities_table(&pool).await?;
        Ok(Self { pool })
    }

    /// Bulk insert with conflict-ignore semantics, all-or-nothing
    ///
    /// # Errors
    ///
    /// Returns a storage or encoding error; no partial batch is visible
    /// afterwards.
    pub async fn bulk_insert(&self, entities: &[LangEntity]) -> DataResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        // Encode outside the transaction so encoding failures cost nothing.
        let mut encoded = Vec::with_capacity(entities.len());
        for entity in entities {
            encoded.push((
                &entity.id,
                &entity.label,
                &entity.description,
                serde_json::to_string(&entity.aliases)?,
                serde_json::to_string(&entity.claims)?,
            ));
        }

        let mut tx = self.pool.begin().await?;
        for chunk in encoded.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO entities (id, label, description, aliases, claims) ",
            );
            builder.push_values(chunk, |mut row, (id, label, description, aliases, claims)| {
                row.push_bind(*id)
                    .push_bind(*label)
                    .push_bind(*description)
                    .push_bind(aliases)
                    .push_bind(claims);
            });
            builder.push(" ON CONFLICT(id) DO NOTHING");
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Fetch one entity by id
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails or a decoding error if a
    /// stored JSON column is corrupt.
    pub async fn get(&self, id: &str) -> DataResult<Option<LangEntity>> {
        let row = sqlx::query(
            "SELECT id, label, description, aliases, claims FROM entities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| decode_entity(&row)).transpose()
    }

    /// Fetch many entities by id; absent ids are simply missing
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn get_many(&self, ids: &[&str]) -> DataResult<Vec<LangEntity>> {
        let mut entities = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(SELECT_CHUNK_IDS) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT id, label, description, aliases, claims FROM entities WHERE id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            builder.push(")");
            let rows = builder.build().fetch_all(&self.pool).await?;
            for row in rows {
                entities.push(decode_entity(&row)?);
            }
        }
        Ok(entities)
    }

    /// Fetch just the label of an entity: the textifier's hot path
    ///
    /// Empty labels count as absent so snak rendering can fall through to
    /// its lookup-miss behavior.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn label(&self, id: &str) -> DataResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT label FROM entities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(label,)| label).filter(|label| !label.is_empty()))
    }

    /// Total number of projected entities
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn count(&self) -> DataResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Fetch up to `limit` Wikipedia-member entities with id greater than
    /// `cursor`, in id order
    ///
    /// The stage C input scan: entities joined against the id table's
    /// `in_wikipedia` flag.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn scan_wikipedia_after(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> DataResult<Vec<LangEntity>> {
        let rows = sqlx::query(
            "SELECT e.id, e.label, e.description, e.aliases, e.claims \
             FROM entities e JOIN ids i ON e.id = i.id \
             WHERE i.in_wikipedia = 1 AND e.id > ? \
             ORDER BY e.id LIMIT ?",
        )
        .bind(cursor.unwrap_or(""))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_entity).collect()
    }

    /// Stream every Wikipedia-member entity in id order
    pub fn stream_wikipedia(
        &self,
        page_size: usize,
    ) -> impl Stream<Item = DataResult<LangEntity>> + Send {
        let store = self.clone();
        let page_size = page_size.max(1);
        futures::stream::try_unfold(None::<String>, move |cursor| {
            let store = store.clone();
            async move {
                let page = store
                    .scan_wikipedia_after(cursor.as_deref(), page_size)
                    .await?;
                if page.is_empty() {
                    return Ok::<_, DataError>(None);
                }
                let next = page.last().map(|entity| entity.id.clone());
                let items = futures::stream::iter(page.into_iter().map(Ok::<_, DataError>));
                Ok(Some((items, next)))
            }
        })
        .try_flatten()
    }
}

fn decode_entity(row: &SqliteRow) -> DataResult<LangEntity> {
    let id: String = row.try_get("id")?;
    let aliases_raw: String = row.try_get("aliases")?;
    let claims_raw: String = row.try_get("claims")?;
    let aliases: Vec<String> = serde_json::from_str(&aliases_raw)
        .map_err(|e| DataError::Parse(format!("aliases for {id}: {e}")))?;
    let claims: ClaimMap = serde_json::from_str(&claims_raw)
        .map_err(|e| DataError::Parse(format!("claims for {id}: {e}")))?;
    Ok(LangEntity {
        label: row.try_get("label")?,
        description: row.try_get("description")?,
        id,
        aliases,
        claims,
    })
}
