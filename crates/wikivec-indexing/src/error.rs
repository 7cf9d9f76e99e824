//! Error types for the ingestion stages

use thiserror::Error;

/// Result type alias for stage operations
pub type IndexingResult<T> = Result<T, IndexingError>;

/// Stage-fatal errors
///
/// Per-record failures (bad JSON, unrenderable entities) are logged and
/// skipped inside the handlers; what surfaces here terminates the stage.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Dump reading failed
    #[error(transparent)]
    Dump(#[from] wikivec_dump::DumpError),

    /// A store operation failed
    #[error(transparent)]
    Data(#[from] wikivec_data::DataError),

    /// Textification failed
    #[error(transparent)]
    Textify(#[from] wikivec_textify::TextifyError),

    /// Embedding failed with a non-retryable error
    #[error(transparent)]
    Embedding(#[from] wikivec_embeddings::EmbeddingError),

    /// An index operation failed with a non-retryable error
    #[error(transparent)]
    Index(#[from] wikivec_vector_data::VectorDataError),

    /// The stage was cancelled while retrying
    #[error("stage cancelled")]
    Cancelled,

    /// Generic error for other cases
    #[error("Other error: {0}")]
    Other(String),
}
