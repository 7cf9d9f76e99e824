//! Qdrant vector index backend
//!
//! Stores one point per chunk document. Point ids are UUIDv5 digests of the
//! document id, so re-inserting the same document id is an idempotent
//! upsert rather than a duplicate. All metadata lives in the point payload
//! under the wire field names, which keyword filters address directly.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CollectionExistsRequest, Condition, CreateCollection, DeleteCollection, Distance, Filter,
    PointStruct, SearchPoints, UpsertPoints, VectorParams,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};
use uuid::Uuid;

use wikivec_common::CorrelationId;

use crate::documents::{ChunkDocument, SearchFilter, SearchHit};
use crate::error::{VectorDataError, VectorDataResult};
use crate::storage::traits::VectorIndex;

/// Vector index backed by a Qdrant collection
#[derive(Clone)]
pub struct QdrantIndex {
    client: std::sync::Arc<Qdrant>,
    collection_name: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect to Qdrant and ensure the collection exists
    ///
    /// # Errors
    ///
    /// Returns a storage error when the client cannot be built or the
    /// collection cannot be created.
    pub async fn new(url: &str, collection_name: &str, dimension: usize) -> VectorDataResult<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Ok(api_key) = std::env::var("QDRANT_API_KEY") {
            builder = builder.api_key(api_key);
        }
        let client = builder
            .build()
            .map_err(|e| VectorDataError::Storage(format!("failed to create Qdrant client: {e}")))?;

        let index = Self {
            client: std::sync::Arc::new(client),
            collection_name: collection_name.to_string(),
            dimension,
        };
        index.ensure_collection().await?;
        Ok(index)
    }

    /// Deterministic point id for a document id
    fn point_id(document_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, document_id.as_bytes()).to_string()
    }

    fn build_filter(filter: &SearchFilter) -> Option<Filter> {
        if filter.is_empty() {
            return None;
        }
        let mut must: Vec<Condition> = Vec::new();
        if let Some(qid) = &filter.qid {
            must.push(Condition::matches("QID", qid.clone()));
        }
        match filter.languages.as_slice() {
            [] => {}
            [language] => must.push(Condition::matches("Language", language.clone())),
            languages => {
                let any_language = Filter::should(
                    languages
                        .iter()
                        .map(|language| Condition::matches("Language", language.clone()))
                        .collect::<Vec<_>>(),
                );
                must.push(Condition::from(any_language));
            }
        }
        Some(Filter::must(must))
    }

    fn payload_for(document: &ChunkDocument) -> VectorDataResult<Payload> {
        let mut value = serde_json::to_value(&document.metadata)
            .map_err(|e| VectorDataError::Decode(format!("metadata encoding: {e}")))?;
        if let Some(map) = value.as_object_mut() {
            map.insert("Text".to_string(), document.text.clone().into());
            map.insert("DocId".to_string(), document.id.clone().into());
        }
        Payload::try_from(value)
            .map_err(|e| VectorDataError::Decode(format!("payload encoding: {e}")))
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn collection_exists(&self) -> VectorDataResult<bool> {
        let request = CollectionExistsRequest {
            collection_name: self.collection_name.clone(),
        };
        self.client
            .collection_exists(request)
            .await
            .map_err(|e| VectorDataError::Storage(format!("failed to check collection: {e}")))
    }

    async fn ensure_collection(&self) -> VectorDataResult<()> {
        if self.collection_exists().await? {
            return Ok(());
        }
        let request = CreateCollection {
            collection_name: self.collection_name.clone(),
            vectors_config: Some(
                VectorParams {
                    size: self.dimension as u64,
                    distance: Distance::Cosine as i32,
                    ..Default::default()
                }
                .into(),
            ),
            ..Default::default()
        };
        match self.client.create_collection(request).await {
            Ok(_) => {
                info!(collection = %self.collection_name, "created collection");
                Ok(())
            }
            Err(e) if e.to_string().contains("already exists") => {
                // Another stage worker created it between the check and the
                // create; idempotent.
                Ok(())
            }
            Err(e) => Err(VectorDataError::Storage(format!(
                "failed to create collection '{}': {e}",
                self.collection_name
            ))),
        }
    }

    #[tracing::instrument(skip(self, documents, vectors), fields(count = documents.len()))]
    async fn insert_many(
        &self,
        documents: &[ChunkDocument],
        vectors: &[Vec<f32>],
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<usize> {
        if documents.len() != vectors.len() {
            return Err(VectorDataError::Other(format!(
                "{} documents but {} vectors",
                documents.len(),
                vectors.len()
            )));
        }
        if documents.is_empty() {
            return Ok(0);
        }

        let mut points = Vec::with_capacity(documents.len());
        for (document, vector) in documents.iter().zip(vectors) {
            points.push(PointStruct::new(
                Self::point_id(&document.id),
                vector.clone(),
                Self::payload_for(document)?,
            ));
        }

        let request = UpsertPoints {
            collection_name: self.collection_name.clone(),
            points,
            wait: Some(true),
            ..Default::default()
        };
        self.client
            .upsert_points(request)
            .await
            .map_err(|e| VectorDataError::Transport(format!("upsert failed: {e}")))?;

        debug!(
            correlation_id = %correlation_id,
            count = documents.len(),
            collection = %self.collection_name,
            "inserted points"
        );
        Ok(documents.len())
    }

    #[tracing::instrument(skip(self, query_vector), fields(query_dim = query_vector.len(), limit))]
    async fn search(
        &self,
        query_vector: Vec<f32>,
        filter: &SearchFilter,
        limit: usize,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<SearchHit>> {
        debug!(
            correlation_id = %correlation_id,
            limit,
            collection = %self.collection_name,
            "vector search"
        );
        let request = SearchPoints {
            collection_name: self.collection_name.clone(),
            vector: query_vector,
            limit: limit as u64,
            with_payload: Some(true.into()),
            filter: Self::build_filter(filter),
            ..Default::default()
        };

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDataError::Transport(format!("search failed: {e}")))?;

        let hits = response
            .result
            .into_iter()
            .map(|point| {
                let qid = point
                    .payload
                    .get("QID")
                    .and_then(|v| v.as_str())
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let language = point
                    .payload
                    .get("Language")
                    .and_then(|v| v.as_str())
                    .map(ToString::to_string)
                    .unwrap_or_default();
                SearchHit {
                    id: format!("{qid}_{language}"),
                    score: point.score,
                }
            })
            .collect();
        Ok(hits)
    }

    async fn healthcheck(&self) -> bool {
        self.client.health_check().await.is_ok()
    }

    async fn drop_collection(&self) -> VectorDataResult<bool> {
        if !self.collection_exists().await? {
            return Ok(false);
        }
        let request = DeleteCollection {
            collection_name: self.collection_name.clone(),
            ..Default::default()
        };
        self.client
            .delete_collection(request)
            .await
            .map_err(|e| VectorDataError::Storage(format!("failed to drop collection: {e}")))?;
        info!(collection = %self.collection_name, "dropped collection");
        Ok(true)
    }
}
