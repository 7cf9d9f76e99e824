//! Trait abstraction for embedding providers
//!
//! Documents and queries embed through different task prompts on most
//! retrieval models, so the trait exposes both operations. The vector
//! dimension is fixed at construction and every returned vector has exactly
//! that length.

use async_trait::async_trait;

use crate::error::EmbeddingResult;

/// An embedding provider with a fixed output dimension
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts, one vector per input
    ///
    /// # Errors
    ///
    /// Returns a network error (retryable) or an API/decode error.
    async fn embed_documents(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Embed a single query text
    ///
    /// # Errors
    ///
    /// Returns a network error (retryable) or an API/decode error.
    async fn embed_query(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Output dimension of every vector this embedder produces
    fn dimension(&self) -> usize;

    /// Model identifier, for logs and stats
    fn model_name(&self) -> &str;
}
