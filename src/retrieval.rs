//! Question embedding plus top-k vector search.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::embedder::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::record::{EmbeddingVector, Match};
use crate::store::VectorStore;

/// Default number of matches fetched per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Embeds questions and asks the store for their nearest chunks.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    cache: Option<Mutex<LruCache<String, EmbeddingVector>>>,
}

impl Retriever {
    /// Retriever without an embedding cache.
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            cache: None,
        }
    }

    /// Keeps up to `capacity` question embeddings; 0 disables the cache.
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        self
    }

    /// Returns up to `k` matches for `question`, exactly as ordered by the store.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Match>> {
        if k == 0 {
            return Err(RagError::Validation(
                "top-k must be at least 1".to_string(),
            ));
        }
        let query = self.embed_question(question).await?;
        if let Some(expected) = self.store.dimensions() {
            if query.dimensions() != expected {
                return Err(RagError::config(format!(
                    "question embedding has {} dimensions but stored records have {expected}",
                    query.dimensions()
                )));
            }
        }
        let matches = self
            .store
            .search(&query, k)
            .await
            .map_err(RagError::Retrieval)?;
        debug!(k, returned = matches.len(), "vector search complete");
        Ok(matches)
    }

    async fn embed_question(&self, question: &str) -> Result<EmbeddingVector> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lock().await.get(question).cloned() {
                return Ok(hit);
            }
        }
        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(RagError::Embedding)?;
        if let Some(cache) = &self.cache {
            cache
                .lock()
                .await
                .put(question.to_string(), embedding.clone());
        }
        Ok(embedding)
    }
}
