//! Vector store boundary and its implementations.

use async_trait::async_trait;

use crate::record::{EmbeddingVector, Match, NewRecord, RecordId};

pub mod memory;
pub mod pgvector;
mod table;

pub use memory::MemoryStore;
pub use pgvector::PgVectorStore;
pub use table::TableName;

/// Persists embedded chunks and answers nearest-neighbor queries.
///
/// `search` returns at most `k` matches sorted by descending cosine
/// similarity, ties in insertion order.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stores a record and returns its assigned id.
    async fn insert(&self, record: &NewRecord) -> anyhow::Result<RecordId>;

    /// Returns the `k` records most similar to `query`.
    async fn search(&self, query: &EmbeddingVector, k: usize) -> anyhow::Result<Vec<Match>>;

    /// Embedding dimensionality of stored records, once known.
    fn dimensions(&self) -> Option<usize>;
}
