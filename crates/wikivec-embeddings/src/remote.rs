//! Remote HTTP embedding provider
//!
//! Talks to a Jina-style embeddings endpoint: JSON request carrying the
//! model id, task and input texts; JSON response carrying one Base64-encoded
//! little-endian f32 vector per input. Requesting Base64 keeps the payload
//! compact and byte-exact across models.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use tracing::debug;

use wikivec_config::EmbeddingConfig;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::Embedder;

const PASSAGE_TASK: &str = "retrieval.passage";
const QUERY_TASK: &str = "retrieval.query";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    data: Vec<ApiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedding {
    embedding: String,
}

/// Embedder backed by a remote embeddings API
pub struct RemoteEmbedder {
    client: reqwest::Client,
    api_url: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
}

impl RemoteEmbedder {
    /// Create a provider from the embedding configuration
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            api_key: config.api_key.clone(),
        }
    }

    /// POST one embedding request and decode the vectors
    async fn request(&self, texts: &[&str], task: &str) -> EmbeddingResult<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "dimensions": self.dimension,
            "embedding_type": "base64",
            "task": task,
            "late_chunking": false,
            "input": texts,
        });

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(EmbeddingError::Network(format!(
                "embedding endpoint answered {status}"
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!(
                "embedding endpoint answered {status}: {detail}"
            )));
        }

        let payload: ApiResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Decode(e.to_string()))?;
        if payload.data.len() != texts.len() {
            return Err(EmbeddingError::Api(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                payload.data.len()
            )));
        }

        debug!(count = texts.len(), task, "embedded batch");
        payload
            .data
            .into_iter()
            .map(|item| self.decode_vector(&item.embedding))
            .collect()
    }

    /// Decode one Base64 little-endian f32 vector, checking the dimension
    fn decode_vector(&self, encoded: &str) -> EmbeddingResult<Vec<f32>> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| EmbeddingError::Decode(format!("embedding is not valid Base64: {e}")))?;
        if bytes.len() != self.dimension * 4 {
            return Err(EmbeddingError::Decode(format!(
                "expected {} bytes for a {}-dim vector, received {}",
                self.dimension * 4,
                self.dimension,
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

#[async_trait::async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts, PASSAGE_TASK).await
    }

    async fn embed_query(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut vectors = self.request(&[text], QUERY_TASK).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Api("empty response for query".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
