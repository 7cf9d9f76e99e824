//! Store-backed label resolver
//!
//! Every claim rendered by the textifier costs label lookups; over a full
//! dump the same handful of property and unit ids repeat millions of times.
//! An LRU in front of the LangStore absorbs them. Misses are cached too —
//! an id absent from the store stays absent for the whole stage.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;

use wikivec_data::LangStore;
use wikivec_textify::{LabelResolver, TextifyError, TextifyResult};

/// [`LabelResolver`] over the LangStore with an LRU label cache
pub struct StoreResolver {
    store: LangStore,
    cache: Mutex<LruCache<String, Option<String>>>,
}

impl StoreResolver {
    /// Create a resolver with the given cache capacity
    pub fn new(store: LangStore, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity.max(1))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl LabelResolver for StoreResolver {
    async fn label(&self, id: &str) -> TextifyResult<Option<String>> {
        if let Ok(mut cache) = self.cache.lock()
            && let Some(label) = cache.get(id)
        {
            return Ok(label.clone());
        }
        let label = self
            .store
            .label(id)
            .await
            .map_err(|e| TextifyError::resolver(e.to_string()))?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(id.to_string(), label.clone());
        }
        Ok(label)
    }
}
