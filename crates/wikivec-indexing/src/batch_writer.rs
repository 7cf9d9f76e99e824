//! Buffered document shipping
//!
//! The BatchWriter owns a local buffer of outbound documents. A flush first
//! drops every document whose id is already in the embedding cache — the
//! cache is the ledger of shipped documents, which is what makes re-runs
//! cheap — then embeds the rest, records their vectors, and inserts them
//! into the index. Transient transport failures retry forever with bounded
//! exponential backoff, probing index connectivity before each attempt;
//! only explicit cancellation breaks the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wikivec_common::CorrelationId;
use wikivec_data::EmbedCache;
use wikivec_embeddings::Embedder;
use wikivec_vector_data::{ChunkDocument, VectorIndex};

use crate::error::{IndexingError, IndexingResult};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);
const CONNECTIVITY_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Buffered writer from chunk documents to the vector index
pub struct BatchWriter {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    cache: EmbedCache,
    batch_size: usize,
    buffer: Vec<ChunkDocument>,
    retry_delay: Duration,
    probe_interval: Duration,
    cancel: CancellationToken,
}

impl BatchWriter {
    /// Create a writer flushing every `batch_size` documents
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        cache: EmbedCache,
        batch_size: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            cache,
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
            retry_delay: DEFAULT_RETRY_DELAY,
            probe_interval: CONNECTIVITY_PROBE_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the retry pacing (tests)
    pub const fn with_retry_pacing(mut self, retry_delay: Duration, probe_interval: Duration) -> Self {
        self.retry_delay = retry_delay;
        self.probe_interval = probe_interval;
        self
    }

    /// Attach a cancellation token; cancelling aborts retry loops
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Number of documents currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Enqueue a document, flushing when the buffer reaches the batch size
    ///
    /// # Errors
    ///
    /// Propagates flush errors; see [`Self::flush`].
    pub async fn add_document(&mut self, document: ChunkDocument) -> IndexingResult<()> {
        self.buffer.push(document);
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Ship the buffered documents; returns whether any work was done
    ///
    /// # Errors
    ///
    /// Returns cache/storage errors, non-transient embedding or index
    /// errors, or [`IndexingError::Cancelled`] when cancelled mid-retry.
    pub async fn flush(&mut self) -> IndexingResult<bool> {
        if self.buffer.is_empty() {
            return Ok(false);
        }
        let documents = std::mem::take(&mut self.buffer);
        let correlation_id = CorrelationId::new();

        // Cache hit means the document was shipped by an earlier run.
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        let shipped = self.cache.get_many(&ids).await?;
        let fresh: Vec<ChunkDocument> = documents
            .into_iter()
            .filter(|document| !shipped.contains_key(&document.id))
            .collect();
        if fresh.is_empty() {
            debug!(correlation_id = %correlation_id, "entire batch already shipped");
            return Ok(false);
        }

        let texts: Vec<&str> = fresh.iter().map(|d| d.text.as_str()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_with_retry(batch).await?);
        }

        let entries: Vec<(String, Vec<f32>)> = fresh
            .iter()
            .zip(&vectors)
            .map(|(document, vector)| (document.id.clone(), vector.clone()))
            .collect();
        self.cache.bulk_put(&entries).await?;

        let written = self.insert_with_retry(&fresh, &vectors, &correlation_id).await?;
        debug!(
            correlation_id = %correlation_id,
            written,
            "flushed batch to index"
        );
        Ok(true)
    }

    async fn embed_with_retry(&self, texts: &[&str]) -> IndexingResult<Vec<Vec<f32>>> {
        let mut attempt: u32 = 0;
        loop {
            match self.embedder.embed_documents(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_transient() => {
                    attempt += 1;
                    warn!(attempt, error = %e, "embedding failed, retrying");
                    self.wait_before_retry(attempt).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn insert_with_retry(
        &self,
        documents: &[ChunkDocument],
        vectors: &[Vec<f32>],
        correlation_id: &CorrelationId,
    ) -> IndexingResult<usize> {
        let mut attempt: u32 = 0;
        loop {
            match self.index.insert_many(documents, vectors, correlation_id).await {
                Ok(written) => return Ok(written),
                Err(e) if e.is_transient() => {
                    attempt += 1;
                    warn!(attempt, error = %e, "index insert failed, retrying");
                    self.wait_before_retry(attempt).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Exponential backoff followed by a connectivity probe loop
    async fn wait_before_retry(&self, attempt: u32) -> IndexingResult<()> {
        let backoff = self
            .retry_delay
            .saturating_mul(1u32 << attempt.min(7).saturating_sub(1))
            .min(MAX_RETRY_DELAY);
        tokio::select! {
            () = self.cancel.cancelled() => return Err(IndexingError::Cancelled),
            () = sleep(backoff) => {}
        }
        while !self.index.healthcheck().await {
            info!("index unreachable, waiting for connectivity");
            tokio::select! {
                () = self.cancel.cancelled() => return Err(IndexingError::Cancelled),
                () = sleep(self.probe_interval) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikivec_data::connect_memory;
    use wikivec_embeddings::MockEmbedder;
    use wikivec_vector_data::{ChunkMetadata, MockIndex};

    fn document(id: &str, text: &str) -> ChunkDocument {
        ChunkDocument {
            id: id.to_string(),
            text: text.to_string(),
            metadata: ChunkMetadata {
                md5: String::new(),
                label: String::new(),
                description: String::new(),
                aliases: vec![],
                date: String::new(),
                qid: id.split('_').next().unwrap_or_default().to_string(),
                chunk_id: 1,
                language: "en".to_string(),
                is_item: true,
                is_property: false,
                dump_date: String::new(),
            },
        }
    }

    async fn cache() -> EmbedCache {
        let pool = connect_memory().await.expect("pool");
        EmbedCache::open(pool, "writer_test").await.expect("cache")
    }

    #[tokio::test]
    async fn flush_embeds_and_inserts_fresh_documents() {
        let index = Arc::new(MockIndex::new());
        let embedder = Arc::new(MockEmbedder::new(8));
        let cache = cache().await;
        let mut writer = BatchWriter::new(
            Arc::clone(&index) as Arc<dyn VectorIndex>,
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            cache.clone(),
            4,
        );

        writer.add_document(document("Q1_en_1", "first")).await.expect("add");
        assert!(writer.flush().await.expect("flush"));
        assert_eq!(index.len(), 1);
        // The vector landed in the cache as the shipped ledger.
        assert!(cache.get("Q1_en_1").await.expect("get").is_some());
        // A second flush with nothing buffered does no work.
        assert!(!writer.flush().await.expect("flush"));
    }

    #[tokio::test]
    async fn cached_document_skips_the_embedder() {
        let index = Arc::new(MockIndex::new());
        let embedder = Arc::new(MockEmbedder::new(8));
        let cache = cache().await;
        cache
            .bulk_put(&[("D1".to_string(), vec![0.5f32; 8])])
            .await
            .expect("seed cache");

        let mut writer = BatchWriter::new(
            Arc::clone(&index) as Arc<dyn VectorIndex>,
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            cache,
            4,
        );
        writer.add_document(document("D1", "text")).await.expect("add");
        assert!(!writer.flush().await.expect("flush"));
        assert_eq!(embedder.call_count(), 0, "cached id must not re-embed");
        assert_eq!(index.len(), 0, "cached id is not re-inserted");
    }

    #[tokio::test]
    async fn buffer_flushes_automatically_at_batch_size() {
        let index = Arc::new(MockIndex::new());
        let embedder = Arc::new(MockEmbedder::new(4));
        let mut writer = BatchWriter::new(
            Arc::clone(&index) as Arc<dyn VectorIndex>,
            embedder as Arc<dyn Embedder>,
            cache().await,
            2,
        );

        writer.add_document(document("Q1_en_1", "a")).await.expect("add");
        assert_eq!(index.len(), 0);
        writer.add_document(document("Q2_en_1", "b")).await.expect("add");
        assert_eq!(index.len(), 2);
        assert_eq!(writer.buffered(), 0);
    }

    #[tokio::test]
    async fn transient_index_failure_retries_until_connectivity_returns() {
        let index = Arc::new(MockIndex::new());
        index.set_online(false);
        let embedder = Arc::new(MockEmbedder::new(4));
        let mut writer = BatchWriter::new(
            Arc::clone(&index) as Arc<dyn VectorIndex>,
            embedder as Arc<dyn Embedder>,
            cache().await,
            4,
        )
        .with_retry_pacing(Duration::from_millis(5), Duration::from_millis(5));

        writer.add_document(document("Q1_en_1", "a")).await.expect("add");

        let index_for_recovery = Arc::clone(&index);
        let recovery = tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            index_for_recovery.set_online(true);
        });

        assert!(writer.flush().await.expect("flush"));
        recovery.await.expect("recovery task");
        assert_eq!(index.len(), 1);
        assert!(index.insert_calls() > 1, "must have retried");
    }

    #[tokio::test]
    async fn cancellation_breaks_the_retry_loop() {
        let index = Arc::new(MockIndex::new());
        index.set_online(false);
        let embedder = Arc::new(MockEmbedder::new(4));
        let cancel = CancellationToken::new();
        let mut writer = BatchWriter::new(
            Arc::clone(&index) as Arc<dyn VectorIndex>,
            embedder as Arc<dyn Embedder>,
            cache().await,
            4,
        )
        .with_retry_pacing(Duration::from_millis(5), Duration::from_millis(5))
        .with_cancellation(cancel.clone());

        writer.add_document(document("Q1_en_1", "a")).await.expect("add");

        let canceller = tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        });

        let result = writer.flush().await;
        canceller.await.expect("canceller task");
        assert!(matches!(result, Err(IndexingError::Cancelled)));
    }
}
