//! Error types for retrieval

use thiserror::Error;

/// Result type alias for retrieval operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised while querying the indexes
#[derive(Error, Debug)]
pub enum SearchError {
    /// Query embedding failed
    #[error(transparent)]
    Embedding(#[from] wikivec_embeddings::EmbeddingError),

    /// The index query failed
    #[error(transparent)]
    Index(#[from] wikivec_vector_data::VectorDataError),

    /// The query-embedding cache failed
    #[error(transparent)]
    Cache(#[from] wikivec_data::DataError),

    /// Generic error for other cases
    #[error("Other error: {0}")]
    Other(String),
}
