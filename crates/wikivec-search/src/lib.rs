//! Retrieval layer for the wikivec pipeline
//!
//! Batched similarity and comparative queries against the dense vector
//! index and the keyword index, behind one [`Retriever`] interface.

pub mod error;
pub mod retriever;

pub use error::{SearchError, SearchResult};
pub use retriever::{DenseRetriever, KeywordRetriever, Ranked, Retriever};
