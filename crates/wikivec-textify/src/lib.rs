//! Entity textification for the wikivec pipeline
//!
//! Converts language-projected Wikidata entities into locale-formatted text
//! and splits that text into token-bounded chunks. Formatting rules live in
//! per-language locale packs (pure data); label lookups go through the
//! [`LabelResolver`] seam so the renderer stays independent of the store.

pub mod chunker;
pub mod error;
pub mod locale;
pub mod resolver;
pub mod textifier;
pub mod time;
pub mod tokenizer;

pub use chunker::chunk_text;
pub use error::{TextifyError, TextifyResult};
pub use locale::{ClaimText, LocalePack, PropertyTextMap, QualifierTextMap};
pub use resolver::{LabelResolver, MapResolver};
pub use textifier::{SnakText, Textifier};
pub use time::time_to_text;
pub use tokenizer::{HfTokenizer, TokenSpans, Tokenizer, WhitespaceTokenizer};
