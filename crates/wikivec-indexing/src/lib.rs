//! Staged ingestion for the wikivec pipeline
//!
//! Three restartable stages connect the dump to the indexes: id discovery,
//! language projection, and textify-and-ship. The [`BatchWriter`] buffers
//! outbound documents, deduplicates against the embedding cache, and ships
//! to the index with retry on transient failure.

pub mod batch_writer;
pub mod documents;
pub mod error;
pub mod resolver;
pub mod stages;

pub use batch_writer::BatchWriter;
pub use documents::build_documents;
pub use error::{IndexingError, IndexingResult};
pub use resolver::StoreResolver;
pub use stages::{discover_ids, project_entities, ship_chunks};
