//! Centralized configuration for the wikivec pipeline
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Environment variable overrides (`WIKIVEC_*`)
//! 3. Runtime validation
//!
//! Every stage entry point takes an [`ApplicationConfig`] value; nothing in
//! the pipeline reads the environment directly.

pub mod error;

pub use error::{ConfigError, ConfigResult};

use std::path::PathBuf;

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

// Language / locale
const DEFAULT_LANGUAGE: &str = "en";

// Dump reading
const DEFAULT_DUMP_PATH: &str = "data/latest-all.json.bz2";
const DEFAULT_QUEUE_CAPACITY: usize = 1500;
const DEFAULT_SKIP_LINES: usize = 0;
const DEFAULT_REPORT_INTERVAL_SECS: u64 = 3;

// Store batching
const DEFAULT_ID_BATCH_SIZE: usize = 1000;
const DEFAULT_LANG_BATCH_SIZE: usize = 1000;

// Storage layout
const DEFAULT_DATA_DIR: &str = "data";

// Textifier
const DEFAULT_TOKENIZER_FILE: &str = "tokenizer.json";
const DEFAULT_MAX_CHUNK_TOKENS: usize = 1024;
const DEFAULT_LABEL_CACHE_CAPACITY: usize = 100_000;

// Embedding
const DEFAULT_EMBEDDING_API_URL: &str = "https://api.jina.ai/v1/embeddings";
const DEFAULT_EMBEDDING_MODEL: &str = "jina-embeddings-v3";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 8;

// Vector index
const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
const DEFAULT_COLLECTION_NAME: &str = "wikidata";

// Keyword index
const DEFAULT_KEYWORD_URL: &str = "http://localhost:9200";
const DEFAULT_KEYWORD_INDEX: &str = "wikidata";

// Retrieval
const DEFAULT_RETRIEVAL_K: usize = 50;
const DEFAULT_QUERY_CACHE_NAMESPACE: &str = "query_cache";

/// Core configuration for a pipeline run
///
/// All settings have safe defaults and can be overridden via environment
/// variables. The same defaults work for dev, test and production.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplicationConfig {
    /// Target natural language for extraction and textification
    pub language: String,

    /// Locale pack used for formatting; usually equal to `language`
    pub locale: String,

    /// Dump reader configuration
    pub dump: DumpConfig,

    /// Persistent store configuration
    pub storage: StorageConfig,

    /// Textifier and chunking configuration
    pub textifier: TextifierConfig,

    /// Remote embedder configuration
    pub embedding: EmbeddingConfig,

    /// Vector index configuration
    pub vector: VectorConfig,

    /// Keyword index configuration
    pub keyword: KeywordConfig,

    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

/// Dump reader settings
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DumpConfig {
    /// Path to the dump file (`.json`, `.json.gz` or `.json.bz2`)
    pub path: PathBuf,

    /// Number of consumer workers
    pub workers: usize,

    /// Bounded queue capacity between producer and consumers
    pub queue_capacity: usize,

    /// Lines to skip at the start of the file (restart support)
    pub skip_lines: usize,

    /// Seconds between reporter log lines
    pub report_interval_secs: u64,

    /// Dump date string stamped onto every emitted chunk (e.g. "20240101")
    pub dump_date: String,
}

/// Locations and batch thresholds of the persistent stores
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite files
    pub data_dir: PathBuf,

    /// Bulk-upsert threshold for the id discovery stage
    pub id_batch_size: usize,

    /// Bulk-insert threshold for the language projection stage
    pub lang_batch_size: usize,
}

impl StorageConfig {
    /// Path of the language-scoped store file (ids + projected entities)
    pub fn lang_db_path(&self, language: &str) -> PathBuf {
        self.data_dir.join(format!("wikivec_{language}wiki.db"))
    }

    /// Path of the shared embedding cache file
    pub fn cache_db_path(&self) -> PathBuf {
        self.data_dir.join("wikivec_embed_cache.db")
    }
}

/// Textifier and chunking settings
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TextifierConfig {
    /// Path to a Hugging Face `tokenizer.json` file
    pub tokenizer_file: PathBuf,

    /// Maximum tokens per emitted chunk
    pub max_chunk_tokens: usize,

    /// Capacity of the in-memory label lookup cache
    pub label_cache_capacity: usize,
}

/// Remote embedder settings
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingConfig {
    /// Embeddings API endpoint
    pub api_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Fixed embedding dimension; stored cache entries must decode to
    /// exactly this many f32 values
    pub dimension: usize,

    /// Documents per embedding request, and the BatchWriter buffer size
    pub batch_size: usize,

    /// Bearer token, if the endpoint requires one
    pub api_key: Option<String>,
}

/// Vector index settings
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VectorConfig {
    /// Qdrant server URL
    pub url: String,

    /// Collection name
    pub collection: String,
}

/// Keyword index settings
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct KeywordConfig {
    /// Search server URL
    pub url: String,

    /// Index name
    pub index: String,
}

/// Retrieval settings
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetrievalConfig {
    /// Results per query
    pub k: usize,

    /// EmbedCache namespace for query embeddings (keyed by query text)
    pub query_cache_namespace: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        let language = DEFAULT_LANGUAGE.to_string();
        Self {
            locale: language.clone(),
            language,
            dump: DumpConfig {
                path: PathBuf::from(DEFAULT_DUMP_PATH),
                workers: default_worker_count(),
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
                skip_lines: DEFAULT_SKIP_LINES,
                report_interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
                dump_date: String::new(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from(DEFAULT_DATA_DIR),
                id_batch_size: DEFAULT_ID_BATCH_SIZE,
                lang_batch_size: DEFAULT_LANG_BATCH_SIZE,
            },
            textifier: TextifierConfig {
                tokenizer_file: PathBuf::from(DEFAULT_TOKENIZER_FILE),
                max_chunk_tokens: DEFAULT_MAX_CHUNK_TOKENS,
                label_cache_capacity: DEFAULT_LABEL_CACHE_CAPACITY,
            },
            embedding: EmbeddingConfig {
                api_url: DEFAULT_EMBEDDING_API_URL.to_string(),
                model: DEFAULT_EMBEDDING_MODEL.to_string(),
                dimension: DEFAULT_EMBEDDING_DIMENSION,
                batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
                api_key: None,
            },
            vector: VectorConfig {
                url: DEFAULT_QDRANT_URL.to_string(),
                collection: DEFAULT_COLLECTION_NAME.to_string(),
            },
            keyword: KeywordConfig {
                url: DEFAULT_KEYWORD_URL.to_string(),
                index: DEFAULT_KEYWORD_INDEX.to_string(),
            },
            retrieval: RetrievalConfig {
                k: DEFAULT_RETRIEVAL_K,
                query_cache_namespace: DEFAULT_QUERY_CACHE_NAMESPACE.to_string(),
            },
        }
    }
}

impl ApplicationConfig {
    /// Build a configuration from defaults plus `WIKIVEC_*` environment
    /// overrides, then validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed or a setting fails
    /// validation.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Ok(language) = std::env::var("WIKIVEC_LANGUAGE") {
            config.locale = language.clone();
            config.language = language;
        }
        if let Ok(locale) = std::env::var("WIKIVEC_LOCALE") {
            config.locale = locale;
        }

        if let Ok(path) = std::env::var("WIKIVEC_DUMP_PATH") {
            config.dump.path = PathBuf::from(path);
        }
        env_parse("WIKIVEC_WORKERS", &mut config.dump.workers)?;
        env_parse("WIKIVEC_QUEUE_CAPACITY", &mut config.dump.queue_capacity)?;
        env_parse("WIKIVEC_SKIP_LINES", &mut config.dump.skip_lines)?;
        if let Ok(date) = std::env::var("WIKIVEC_DUMP_DATE") {
            config.dump.dump_date = date;
        }

        if let Ok(dir) = std::env::var("WIKIVEC_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        env_parse("WIKIVEC_ID_BATCH_SIZE", &mut config.storage.id_batch_size)?;
        env_parse("WIKIVEC_LANG_BATCH_SIZE", &mut config.storage.lang_batch_size)?;

        if let Ok(path) = std::env::var("WIKIVEC_TOKENIZER_FILE") {
            config.textifier.tokenizer_file = PathBuf::from(path);
        }
        env_parse(
            "WIKIVEC_MAX_CHUNK_TOKENS",
            &mut config.textifier.max_chunk_tokens,
        )?;

        if let Ok(url) = std::env::var("WIKIVEC_EMBEDDING_API_URL") {
            config.embedding.api_url = url;
        }
        if let Ok(model) = std::env::var("WIKIVEC_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        env_parse("WIKIVEC_EMBEDDING_DIMENSION", &mut config.embedding.dimension)?;
        env_parse(
            "WIKIVEC_EMBEDDING_BATCH_SIZE",
            &mut config.embedding.batch_size,
        )?;
        if let Ok(key) = std::env::var("WIKIVEC_EMBEDDING_API_KEY") {
            config.embedding.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("WIKIVEC_QDRANT_URL") {
            config.vector.url = url;
        }
        if let Ok(name) = std::env::var("WIKIVEC_COLLECTION") {
            config.vector.collection = name;
        }

        if let Ok(url) = std::env::var("WIKIVEC_KEYWORD_URL") {
            config.keyword.url = url;
        }
        if let Ok(name) = std::env::var("WIKIVEC_KEYWORD_INDEX") {
            config.keyword.index = name;
        }

        env_parse("WIKIVEC_RETRIEVAL_K", &mut config.retrieval.k)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Validation`] naming the offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.language.is_empty() {
            return Err(ConfigError::validation("language", "must not be empty"));
        }
        if self.dump.workers == 0 {
            return Err(ConfigError::validation("dump.workers", "must be at least 1"));
        }
        if self.dump.queue_capacity == 0 {
            return Err(ConfigError::validation(
                "dump.queue_capacity",
                "must be at least 1",
            ));
        }
        if self.storage.id_batch_size == 0 || self.storage.lang_batch_size == 0 {
            return Err(ConfigError::validation(
                "storage batch sizes",
                "must be at least 1",
            ));
        }
        if self.textifier.max_chunk_tokens == 0 {
            return Err(ConfigError::validation(
                "textifier.max_chunk_tokens",
                "must be at least 1",
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::validation(
                "embedding.dimension",
                "must be at least 1",
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::validation(
                "embedding.batch_size",
                "must be at least 1",
            ));
        }
        if self.retrieval.k == 0 {
            return Err(ConfigError::validation("retrieval.k", "must be at least 1"));
        }
        Ok(())
    }
}

/// Default consumer count: all cores but one, at least one
fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

fn env_parse<T: std::str::FromStr>(variable: &str, slot: &mut T) -> ConfigResult<()>
where
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(variable) {
        *slot = raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid_value(variable, e.to_string()))?;
    }
    Ok(())
}
