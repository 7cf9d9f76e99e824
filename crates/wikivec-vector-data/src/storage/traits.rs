//! Index abstraction traits
//!
//! Two backends serve retrieval: a dense vector index queried by embedding
//! and a keyword index queried by text. Both report hits in the same shape
//! so the retrievers are interchangeable.

use async_trait::async_trait;

use wikivec_common::CorrelationId;

use crate::documents::{ChunkDocument, SearchFilter, SearchHit};
use crate::error::VectorDataResult;

/// Dense vector index keyed by document id
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if it does not exist
    ///
    /// # Errors
    ///
    /// Returns a transport or storage error.
    async fn ensure_collection(&self) -> VectorDataResult<()>;

    /// Whether the collection exists
    ///
    /// # Errors
    ///
    /// Returns a transport or storage error.
    async fn collection_exists(&self) -> VectorDataResult<bool>;

    /// Insert documents with their vectors; insertion is keyed by document
    /// id, so re-inserting an id overwrites idempotently
    ///
    /// Returns the number of points written.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the backend is unreachable (the
    /// caller retries) or a storage error when the write is rejected.
    async fn insert_many(
        &self,
        documents: &[ChunkDocument],
        vectors: &[Vec<f32>],
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<usize>;

    /// Cosine-similarity search, optionally filtered
    ///
    /// # Errors
    ///
    /// Returns a transport or storage error.
    async fn search(
        &self,
        query_vector: Vec<f32>,
        filter: &SearchFilter,
        limit: usize,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<SearchHit>>;

    /// Whether the backend currently answers; the BatchWriter probes this
    /// before every retry
    async fn healthcheck(&self) -> bool;

    /// Drop the whole collection; returns whether it existed
    ///
    /// # Errors
    ///
    /// Returns a transport or storage error.
    async fn drop_collection(&self) -> VectorDataResult<bool>;
}

/// Keyword (best-match text) index keyed by document id
#[async_trait]
pub trait KeywordIndex: Send + Sync {
    /// Create the index with its analyzers and mappings if it does not
    /// exist
    ///
    /// # Errors
    ///
    /// Returns a transport or storage error.
    async fn ensure_index(&self) -> VectorDataResult<()>;

    /// Insert documents; ids already present are left untouched
    ///
    /// Returns the number of documents written.
    ///
    /// # Errors
    ///
    /// Returns a transport or storage error.
    async fn insert_many(&self, documents: &[ChunkDocument]) -> VectorDataResult<usize>;

    /// Best-match text search over the single text field, optionally
    /// filtered
    ///
    /// # Errors
    ///
    /// Returns a transport or storage error.
    async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: usize,
    ) -> VectorDataResult<Vec<SearchHit>>;

    /// Whether the backend currently answers
    async fn healthcheck(&self) -> bool;
}
