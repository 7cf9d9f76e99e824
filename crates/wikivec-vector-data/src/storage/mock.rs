//! In-memory index backend for tests
//!
//! Implements both index traits over a hash map. The `online` switch lets
//! tests simulate an unreachable backend and watch the BatchWriter's retry
//! loop recover.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use wikivec_common::CorrelationId;

use crate::documents::{ChunkDocument, SearchFilter, SearchHit};
use crate::error::{VectorDataError, VectorDataResult};
use crate::storage::traits::{KeywordIndex, VectorIndex};

/// In-memory index keyed by document id
#[derive(Default)]
pub struct MockIndex {
    state: Mutex<HashMap<String, (ChunkDocument, Vec<f32>)>>,
    offline: AtomicBool,
    insert_calls: AtomicUsize,
}

impl MockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle reachability; while offline every operation fails with a
    /// transport error and the healthcheck reports false
    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Number of insert calls attempted (including failed ones)
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Number of documents currently stored
    pub fn len(&self) -> usize {
        self.state.lock().map(|state| state.len()).unwrap_or(0)
    }

    /// Whether the index holds no documents
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a stored document by id
    pub fn get(&self, id: &str) -> Option<ChunkDocument> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.get(id).map(|(document, _)| document.clone()))
    }

    fn check_online(&self) -> VectorDataResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(VectorDataError::Transport("mock index offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn matches(document: &ChunkDocument, filter: &SearchFilter) -> bool {
        if let Some(qid) = &filter.qid
            && &document.metadata.qid != qid
        {
            return false;
        }
        if !filter.languages.is_empty()
            && !filter.languages.contains(&document.metadata.language)
        {
            return false;
        }
        true
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }

    fn top_hits(mut scored: Vec<(SearchHit, f32)>, limit: usize) -> Vec<SearchHit> {
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(limit)
            .map(|(hit, _)| hit)
            .collect()
    }
}

#[async_trait]
impl VectorIndex for MockIndex {
    async fn ensure_collection(&self) -> VectorDataResult<()> {
        self.check_online()
    }

    async fn collection_exists(&self) -> VectorDataResult<bool> {
        self.check_online()?;
        Ok(true)
    }

    async fn insert_many(
        &self,
        documents: &[ChunkDocument],
        vectors: &[Vec<f32>],
        _correlation_id: &CorrelationId,
    ) -> VectorDataResult<usize> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if documents.len() != vectors.len() {
            return Err(VectorDataError::Other(format!(
                "{} documents but {} vectors",
                documents.len(),
                vectors.len()
            )));
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| VectorDataError::Other("mock state poisoned".to_string()))?;
        for (document, vector) in documents.iter().zip(vectors) {
            state.insert(document.id.clone(), (document.clone(), vector.clone()));
        }
        Ok(documents.len())
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        filter: &SearchFilter,
        limit: usize,
        _correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<SearchHit>> {
        self.check_online()?;
        let state = self
            .state
            .lock()
            .map_err(|_| VectorDataError::Other("mock state poisoned".to_string()))?;
        let scored = state
            .values()
            .filter(|(document, _)| Self::matches(document, filter))
            .map(|(document, vector)| {
                let score = Self::cosine(&query_vector, vector);
                (
                    SearchHit {
                        id: document.result_id(),
                        score,
                    },
                    score,
                )
            })
            .collect();
        Ok(Self::top_hits(scored, limit))
    }

    async fn healthcheck(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }

    async fn drop_collection(&self) -> VectorDataResult<bool> {
        self.check_online()?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| VectorDataError::Other("mock state poisoned".to_string()))?;
        let existed = !state.is_empty();
        state.clear();
        Ok(existed)
    }
}

#[async_trait]
impl KeywordIndex for MockIndex {
    async fn ensure_index(&self) -> VectorDataResult<()> {
        self.check_online()
    }

    async fn insert_many(&self, documents: &[ChunkDocument]) -> VectorDataResult<usize> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| VectorDataError::Other("mock state poisoned".to_string()))?;
        let mut written = 0;
        for document in documents {
            if state.contains_key(&document.id) {
                continue;
            }
            state.insert(document.id.clone(), (document.clone(), Vec::new()));
            written += 1;
        }
        Ok(written)
    }

    async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: usize,
    ) -> VectorDataResult<Vec<SearchHit>> {
        self.check_online()?;
        let query_words: Vec<&str> = query.split_whitespace().collect();
        let state = self
            .state
            .lock()
            .map_err(|_| VectorDataError::Other("mock state poisoned".to_string()))?;
        let scored = state
            .values()
            .filter(|(document, _)| Self::matches(document, filter))
            .map(|(document, _)| {
                let score = query_words
                    .iter()
                    .filter(|word| document.text.contains(*word))
                    .count() as f32;
                (
                    SearchHit {
                        id: document.result_id(),
                        score,
                    },
                    score,
                )
            })
            .collect();
        Ok(Self::top_hits(scored, limit))
    }

    async fn healthcheck(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}
