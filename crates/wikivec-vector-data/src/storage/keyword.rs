//! Keyword index backend over an Elasticsearch-style HTTP API
//!
//! Documents are indexed under their document id with the chunk text in a
//! single analyzed `text` field and the metadata as keyword sub-fields.
//! Search is a best-match query on `text`, boosted by a low-weight
//! match-all so queries with no lexical overlap still return K results.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::documents::{ChunkDocument, SearchFilter, SearchHit};
use crate::error::{VectorDataError, VectorDataResult};
use crate::storage::traits::KeywordIndex;

/// Weight of the match-all backstop clause
const MATCH_ALL_BOOST: f32 = 0.05;

/// Keyword index backed by an Elasticsearch-compatible server
#[derive(Clone)]
pub struct KeywordHttpIndex {
    client: reqwest::Client,
    base_url: String,
    index_name: String,
}

impl KeywordHttpIndex {
    /// Connect and ensure the index exists
    ///
    /// # Errors
    ///
    /// Returns a transport or storage error when the index cannot be
    /// created.
    pub async fn new(base_url: &str, index_name: &str) -> VectorDataResult<Self> {
        let index = Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            index_name: index_name.to_string(),
        };
        index.ensure_index().await?;
        Ok(index)
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index_name)
    }

    fn build_query(&self, query: &str, filter: &SearchFilter, limit: usize) -> Value {
        let mut filters: Vec<Value> = Vec::new();
        if let Some(qid) = &filter.qid {
            filters.push(json!({"term": {"metadata.QID": qid}}));
        }
        match filter.languages.as_slice() {
            [] => {}
            [language] => filters.push(json!({"term": {"metadata.Language": language}})),
            languages => filters.push(json!({
                "bool": {
                    "should": languages
                        .iter()
                        .map(|language| json!({"term": {"metadata.Language": language}}))
                        .collect::<Vec<_>>()
                }
            })),
        }

        json!({
            "query": {
                "bool": {
                    "must": {"match": {"text": query}},
                    "should": [{"match_all": {"boost": MATCH_ALL_BOOST}}],
                    "filter": filters
                }
            },
            "size": limit
        })
    }

    async fn document_exists(&self, id: &str) -> VectorDataResult<bool> {
        let url = format!("{}/_doc/{id}?_source=false", self.index_url());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VectorDataError::Transport(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl KeywordIndex for KeywordHttpIndex {
    async fn ensure_index(&self) -> VectorDataResult<()> {
        let response = self
            .client
            .head(self.index_url())
            .send()
            .await
            .map_err(|e| VectorDataError::Transport(e.to_string()))?;
        if response.status().is_success() {
            return Ok(());
        }

        let settings = json!({
            "settings": {
                "analysis": {
                    "analyzer": {
                        "rebuilt_standard": {
                            "tokenizer": "standard",
                            "filter": ["lowercase", "stop"]
                        }
                    }
                }
            },
            "mappings": {
                "properties": {
                    "text": {"type": "text", "analyzer": "default"},
                    "metadata": {
                        "type": "object",
                        "properties": {
                            "QID": {"type": "keyword"},
                            "Language": {"type": "keyword"},
                            "Date": {"type": "keyword"}
                        }
                    }
                }
            }
        });

        let response = self
            .client
            .put(self.index_url())
            .json(&settings)
            .send()
            .await
            .map_err(|e| VectorDataError::Transport(e.to_string()))?;
        if response.status().is_success() {
            info!(index = %self.index_name, "created keyword index");
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(VectorDataError::Storage(format!(
                "failed to create index '{}': {detail}",
                self.index_name
            )))
        }
    }

    async fn insert_many(&self, documents: &[ChunkDocument]) -> VectorDataResult<usize> {
        let mut written = 0;
        for document in documents {
            if self.document_exists(&document.id).await? {
                continue;
            }
            let body = json!({
                "text": document.text,
                "metadata": serde_json::to_value(&document.metadata)
                    .map_err(|e| VectorDataError::Decode(e.to_string()))?,
            });
            let url = format!("{}/_doc/{}", self.index_url(), document.id);
            let response = self
                .client
                .put(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| VectorDataError::Transport(e.to_string()))?;
            if !response.status().is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(VectorDataError::Storage(format!(
                    "failed to index {}: {detail}",
                    document.id
                )));
            }
            written += 1;
        }
        debug!(written, index = %self.index_name, "indexed documents");
        Ok(written)
    }

    async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: usize,
    ) -> VectorDataResult<Vec<SearchHit>> {
        let url = format!("{}/_search", self.index_url());
        let body = self.build_query(query, filter, limit);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorDataError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(VectorDataError::Storage(format!("search failed: {detail}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| VectorDataError::Decode(e.to_string()))?;
        let hits = payload["hits"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .map(|hit| {
                        let qid = hit["_source"]["metadata"]["QID"].as_str().unwrap_or_default();
                        let language = hit["_source"]["metadata"]["Language"]
                            .as_str()
                            .unwrap_or_default();
                        SearchHit {
                            id: format!("{qid}_{language}"),
                            score: hit["_score"].as_f64().unwrap_or_default() as f32,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    async fn healthcheck(&self) -> bool {
        self.client
            .get(&self.base_url)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }
}
