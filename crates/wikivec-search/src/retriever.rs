//! Batched retrieval against the indexes
//!
//! A retriever answers `(ids, scores)` per query, where ids carry the
//! `"<QID>_<Language>"` shape. Two backends share the interface: the dense
//! retriever embeds the query and searches the vector index; the keyword
//! retriever sends the text straight to the keyword index. Batch and
//! comparative retrieval are provided on top of the single-query primitive.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use wikivec_common::CorrelationId;
use wikivec_data::EmbedCache;
use wikivec_embeddings::Embedder;
use wikivec_vector_data::{KeywordIndex, SearchFilter, SearchHit, VectorIndex};

use crate::error::SearchResult;

/// Ids and scores for one query
pub type Ranked = (Vec<String>, Vec<f32>);

/// A batched similarity retriever
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top-`k` hits for one query under a filter
    ///
    /// # Errors
    ///
    /// Returns an embedding, cache or index error.
    async fn get_similar_ids(
        &self,
        query: &str,
        filter: &SearchFilter,
        k: usize,
    ) -> SearchResult<Ranked>;

    /// Top-`k` hits for each query; a comma-separated `language` restricts
    /// results to any of the listed languages
    ///
    /// # Errors
    ///
    /// Returns the first per-query error encountered.
    async fn batch_retrieve(
        &self,
        queries: &[String],
        k: usize,
        language: Option<&str>,
    ) -> SearchResult<(Vec<Vec<String>>, Vec<Vec<f32>>)> {
        let filter = SearchFilter::for_languages(language);
        let mut ids = Vec::with_capacity(queries.len());
        let mut scores = Vec::with_capacity(queries.len());
        for query in queries {
            let (query_ids, query_scores) = self.get_similar_ids(query, &filter, k).await?;
            ids.push(query_ids);
            scores.push(query_scores);
        }
        Ok((ids, scores))
    }

    /// Comparative retrieval: for each query row, issue one filtered query
    /// per comparator column fixing `QID = column[row]`, and concatenate
    /// ids and scores per row in column order
    ///
    /// # Errors
    ///
    /// Returns the first per-query error encountered.
    async fn batch_retrieve_comparative(
        &self,
        queries: &[String],
        comparative: &[Vec<String>],
        k: usize,
        language: Option<&str>,
    ) -> SearchResult<(Vec<Vec<String>>, Vec<Vec<f32>>)> {
        let mut ids: Vec<Vec<String>> = vec![Vec::new(); queries.len()];
        let mut scores: Vec<Vec<f32>> = vec![Vec::new(); queries.len()];
        for column in comparative {
            for (row, query) in queries.iter().enumerate() {
                let Some(qid) = column.get(row) else {
                    continue;
                };
                let filter = SearchFilter::for_languages(language).with_qid(qid.clone());
                let (row_ids, row_scores) = self.get_similar_ids(query, &filter, k).await?;
                ids[row].extend(row_ids);
                scores[row].extend(row_scores);
            }
        }
        Ok((ids, scores))
    }
}

fn unzip_hits(hits: Vec<SearchHit>) -> Ranked {
    hits.into_iter().map(|hit| (hit.id, hit.score)).unzip()
}

/// Dense retriever: query embedding + cosine search on the vector index
///
/// Query embeddings are cached by query text, so repeated evaluation runs
/// never re-embed the same query set.
pub struct DenseRetriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    query_cache: Option<EmbedCache>,
}

impl DenseRetriever {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder,
            query_cache: None,
        }
    }

    /// Attach a query-embedding cache (keyed by query text)
    pub fn with_query_cache(mut self, cache: EmbedCache) -> Self {
        self.query_cache = Some(cache);
        self
    }

    async fn query_vector(&self, query: &str) -> SearchResult<Vec<f32>> {
        if let Some(cache) = &self.query_cache {
            if let Some(vector) = cache.get(query).await? {
                debug!("query embedding served from cache");
                return Ok(vector);
            }
        }
        let vector = self.embedder.embed_query(query).await?;
        if let Some(cache) = &self.query_cache {
            cache.bulk_put(&[(query.to_string(), vector.clone())]).await?;
        }
        Ok(vector)
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    async fn get_similar_ids(
        &self,
        query: &str,
        filter: &SearchFilter,
        k: usize,
    ) -> SearchResult<Ranked> {
        let vector = self.query_vector(query).await?;
        let correlation_id = CorrelationId::new();
        let hits = self.index.search(vector, filter, k, &correlation_id).await?;
        Ok(unzip_hits(hits))
    }
}

/// Keyword retriever: best-match text search on the keyword index
pub struct KeywordRetriever {
    index: Arc<dyn KeywordIndex>,
}

impl KeywordRetriever {
    pub fn new(index: Arc<dyn KeywordIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn get_similar_ids(
        &self,
        query: &str,
        filter: &SearchFilter,
        k: usize,
    ) -> SearchResult<Ranked> {
        let hits = self.index.search(query, filter, k).await?;
        Ok(unzip_hits(hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikivec_data::connect_memory;
    use wikivec_embeddings::MockEmbedder;
    use wikivec_vector_data::{ChunkDocument, ChunkMetadata, MockIndex};

    fn document(qid: &str, language: &str, text: &str) -> ChunkDocument {
        ChunkDocument {
            id: format!("{qid}_{language}_1"),
            text: text.to_string(),
            metadata: ChunkMetadata {
                md5: String::new(),
                label: String::new(),
                description: String::new(),
                aliases: vec![],
                date: String::new(),
                qid: qid.to_string(),
                chunk_id: 1,
                language: language.to_string(),
                is_item: true,
                is_property: false,
                dump_date: String::new(),
            },
        }
    }

    async fn seeded_index(embedder: &MockEmbedder) -> Arc<MockIndex> {
        let index = Arc::new(MockIndex::new());
        let correlation_id = CorrelationId::new();
        let documents = vec![
            document("Q1", "en", "the universe is everything"),
            document("Q2", "en", "a galaxy of stars"),
            document("Q1", "de", "das universum"),
        ];
        let vectors: Vec<Vec<f32>> = documents
            .iter()
            .map(|d| embedder.vector_for(&d.text))
            .collect();
        VectorIndex::insert_many(index.as_ref(), &documents, &vectors, &correlation_id)
            .await
            .expect("insert");
        index
    }

    #[tokio::test]
    async fn batch_retrieve_answers_each_query() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let index = seeded_index(&embedder).await;
        let retriever =
            DenseRetriever::new(index as Arc<dyn VectorIndex>, embedder as Arc<dyn Embedder>);

        let queries = vec![
            "the universe is everything".to_string(),
            "a galaxy of stars".to_string(),
        ];
        let (ids, scores) = retriever
            .batch_retrieve(&queries, 2, None)
            .await
            .expect("retrieve");
        assert_eq!(ids.len(), 2);
        assert_eq!(scores.len(), 2);
        // Identical text embeds identically, so the matching document wins.
        assert_eq!(ids[0][0], "Q1_en");
        assert_eq!(ids[1][0], "Q2_en");
        assert!(scores[0][0] >= scores[0][1]);
    }

    #[tokio::test]
    async fn language_filter_is_a_disjunction() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let index = seeded_index(&embedder).await;
        let retriever =
            DenseRetriever::new(index as Arc<dyn VectorIndex>, embedder as Arc<dyn Embedder>);

        let queries = vec!["das universum".to_string()];
        let (ids, _) = retriever
            .batch_retrieve(&queries, 10, Some("de"))
            .await
            .expect("retrieve");
        assert_eq!(ids[0], vec!["Q1_de"]);

        let (ids, _) = retriever
            .batch_retrieve(&queries, 10, Some("de,en"))
            .await
            .expect("retrieve");
        assert_eq!(ids[0].len(), 3);
    }

    #[tokio::test]
    async fn comparative_retrieval_concatenates_per_row_in_column_order() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let index = seeded_index(&embedder).await;
        let retriever =
            DenseRetriever::new(index as Arc<dyn VectorIndex>, embedder as Arc<dyn Embedder>);

        let queries = vec!["anything".to_string()];
        // Two comparator columns for the single query row.
        let comparative = vec![vec!["Q1".to_string()], vec!["Q2".to_string()]];
        let (ids, scores) = retriever
            .batch_retrieve_comparative(&queries, &comparative, 1, Some("en"))
            .await
            .expect("retrieve");
        assert_eq!(ids[0], vec!["Q1_en", "Q2_en"]);
        assert_eq!(scores[0].len(), 2);
    }

    #[tokio::test]
    async fn query_cache_prevents_reembedding() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let index = seeded_index(&embedder).await;
        let pool = connect_memory().await.expect("pool");
        let cache = EmbedCache::open(pool, "query_cache").await.expect("cache");
        let calls_before_queries = embedder.call_count();
        let retriever = DenseRetriever::new(
            index as Arc<dyn VectorIndex>,
            Arc::clone(&embedder) as Arc<dyn Embedder>,
        )
        .with_query_cache(cache);

        let filter = SearchFilter::default();
        retriever
            .get_similar_ids("what is the universe", &filter, 5)
            .await
            .expect("first");
        retriever
            .get_similar_ids("what is the universe", &filter, 5)
            .await
            .expect("second");
        assert_eq!(
            embedder.call_count() - calls_before_queries,
            1,
            "second identical query must come from the cache"
        );
    }

    #[tokio::test]
    async fn keyword_retriever_shares_the_interface() {
        let index = Arc::new(MockIndex::new());
        KeywordIndex::insert_many(
            index.as_ref(),
            &[
                document("Q1", "en", "the universe is everything"),
                document("Q2", "en", "a galaxy of stars"),
            ],
        )
        .await
        .expect("insert");

        let retriever = KeywordRetriever::new(index as Arc<dyn KeywordIndex>);
        let queries = vec!["universe everything".to_string()];
        let (ids, scores) = retriever
            .batch_retrieve(&queries, 1, None)
            .await
            .expect("retrieve");
        assert_eq!(ids[0], vec!["Q1_en"]);
        assert_eq!(scores[0].len(), 1);
    }
}
