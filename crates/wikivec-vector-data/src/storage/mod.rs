//! Index backends

pub mod keyword;
pub mod mock;
pub mod qdrant;
pub mod traits;

pub use keyword::KeywordHttpIndex;
pub use mock::MockIndex;
pub use qdrant::QdrantIndex;
pub use traits::{KeywordIndex, VectorIndex};
