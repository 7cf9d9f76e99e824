//! Deterministic in-memory embedder for tests
//!
//! Produces a stable pseudo-vector per input text and records every call so
//! tests can assert exactly which texts were embedded.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::Embedder;

/// Test embedder with deterministic output and call recording
pub struct MockEmbedder {
    dimension: usize,
    fail: bool,
    calls: AtomicUsize,
    embedded_texts: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            calls: AtomicUsize::new(0),
            embedded_texts: Mutex::new(Vec::new()),
        }
    }

    /// Make every call fail with a transient network error
    pub const fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of embedding calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text embedded so far, in call order
    pub fn embedded_texts(&self) -> Vec<String> {
        self.embedded_texts
            .lock()
            .map(|texts| texts.clone())
            .unwrap_or_default()
    }

    /// The vector this mock produces for `text`
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        // Cheap stable hash spread across the dimensions.
        let seed = text
            .bytes()
            .fold(0u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(byte)));
        (0..self.dimension)
            .map(|i| {
                let x = seed.wrapping_add(i as u32).wrapping_mul(2_654_435_761);
                (x as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    fn record(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if self.fail {
            return Err(EmbeddingError::Network("mock embedder offline".to_string()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.embedded_texts.lock() {
            log.extend(texts.iter().map(|t| (*t).to_string()));
        }
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.record(texts)
    }

    async fn embed_query(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut vectors = self.record(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Other("empty mock batch".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}
