//! Index wire types and backends for the wikivec pipeline
//!
//! Defines the chunk document and metadata wire format, the search filter,
//! and the two index abstractions (dense vector and keyword) with their
//! concrete backends: Qdrant, an Elasticsearch-style HTTP server, and an
//! in-memory mock for tests.

pub mod documents;
pub mod error;
pub mod storage;

pub use documents::{ChunkDocument, ChunkMetadata, SearchFilter, SearchHit};
pub use error::{VectorDataError, VectorDataResult};
pub use storage::{KeywordHttpIndex, KeywordIndex, MockIndex, QdrantIndex, VectorIndex};
