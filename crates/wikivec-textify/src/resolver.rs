//! Label resolution seam
//!
//! Snak rendering turns referenced ids (items, properties, quantity units)
//! into labels. The textifier only needs this one lookup, so it is a trait:
//! the pipeline implements it over the LangStore, tests over a map.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::TextifyResult;

/// Resolve an entity or property id to its label in the target language
#[async_trait]
pub trait LabelResolver: Send + Sync {
    /// Return the label for `id`, or `None` when the id is unknown or has
    /// no label — which suppresses the referencing claim's value.
    ///
    /// # Errors
    ///
    /// Returns a resolver error when the underlying lookup fails.
    async fn label(&self, id: &str) -> TextifyResult<Option<String>>;
}

/// In-memory resolver over a fixed id→label map
#[derive(Debug, Default, Clone)]
pub struct MapResolver {
    labels: HashMap<String, String>,
}

impl MapResolver {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// Convenience constructor from `(id, label)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            labels: pairs
                .into_iter()
                .map(|(id, label)| (id.into(), label.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl LabelResolver for MapResolver {
    async fn label(&self, id: &str) -> TextifyResult<Option<String>> {
        Ok(self.labels.get(id).cloned())
    }
}
