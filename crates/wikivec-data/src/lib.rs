//! Persistent data layer for the wikivec pipeline
//!
//! Three SQLite-backed stores — discovered ids, language-projected entities
//! and cached embeddings — plus the normalization that turns raw dump JSON
//! into the stored model types. All bulk operations are transactional so a
//! crashed stage never leaves a partial batch behind.

pub mod embed_cache;
pub mod error;
pub mod id_store;
pub mod lang_store;
mod migrations;
pub mod models;
pub mod pool;

pub use embed_cache::{EmbedCache, decode_embedding, encode_embedding};
pub use error::{DataError, DataResult};
pub use id_store::IdStore;
pub use lang_store::LangStore;
pub use models::{
    Claim, ClaimMap, DataType, IdRecord, LangEntity, QualifierMap, Rank, Snak, SnakType,
    clean_claims, entity_in_wikipedia, extract_entity_ids, strip_bookkeeping,
};
pub use pool::{connect, connect_memory, connect_read_only};
