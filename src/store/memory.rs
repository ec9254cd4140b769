//! Exact in-process vector store.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use super::VectorStore;
use crate::record::{EmbeddingVector, Match, NewRecord, RecordId};

/// Brute-force cosine search over records kept in memory.
///
/// The first insert pins the dimensionality; later records and queries must match it.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredRecord>>,
    dimensions: AtomicUsize,
}

struct StoredRecord {
    id: RecordId,
    record: NewRecord,
}

impl MemoryStore {
    /// Empty store with no pinned dimensionality.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True when nothing has been inserted.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Copies of every stored record, in insertion order.
    pub async fn records(&self) -> Vec<(RecordId, NewRecord)> {
        self.records
            .read()
            .await
            .iter()
            .map(|stored| (stored.id, stored.record.clone()))
            .collect()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn insert(&self, record: &NewRecord) -> anyhow::Result<RecordId> {
        let mut records = self.records.write().await;
        let dims = record.embedding.dimensions();
        if let Err(existing) =
            self.dimensions
                .compare_exchange(0, dims, Ordering::SeqCst, Ordering::SeqCst)
        {
            anyhow::ensure!(
                existing == dims,
                "embedding has {dims} dimensions, store expects {existing}"
            );
        }
        let id = records.len() as RecordId + 1;
        records.push(StoredRecord {
            id,
            record: record.clone(),
        });
        Ok(id)
    }

    async fn search(&self, query: &EmbeddingVector, k: usize) -> anyhow::Result<Vec<Match>> {
        let records = self.records.read().await;
        if let Some(dims) = self.dimensions() {
            anyhow::ensure!(
                query.dimensions() == dims,
                "query has {} dimensions, store expects {}",
                query.dimensions(),
                dims
            );
        }
        let mut hits = Vec::new();
        for stored in records.iter() {
            let Some(similarity) = query.cosine_similarity(&stored.record.embedding) else {
                continue;
            };
            match Match::validated(
                stored.id,
                stored.record.title.clone(),
                stored.record.source.clone(),
                stored.record.chunk.clone(),
                similarity,
            ) {
                Ok(hit) => hits.push(hit),
                Err(err) => warn!("skipping malformed record: {err:#}"),
            }
        }
        // stable sort keeps insertion order among equal scores
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(k);
        Ok(hits)
    }

    fn dimensions(&self) -> Option<usize> {
        match self.dimensions.load(Ordering::SeqCst) {
            0 => None,
            dims => Some(dims),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str, values: &[f32]) -> NewRecord {
        NewRecord {
            title: source.trim_end_matches(".txt").to_string(),
            source: source.to_string(),
            chunk: format!("chunk of {source}"),
            sequence_index: 0,
            embedding: EmbeddingVector::new(values.to_vec()).unwrap(),
        }
    }

    fn query(values: &[f32]) -> EmbeddingVector {
        EmbeddingVector::new(values.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn search_sorts_by_similarity_with_stable_ties() {
        let store = MemoryStore::new();
        store.insert(&record("a.txt", &[1.0, 0.0])).await.unwrap();
        store.insert(&record("b.txt", &[0.0, 1.0])).await.unwrap();
        store.insert(&record("c.txt", &[2.0, 0.0])).await.unwrap();
        store.insert(&record("d.txt", &[1.0, 1.0])).await.unwrap();

        let hits = store.search(&query(&[1.0, 0.0]), 10).await.unwrap();
        let sources: Vec<&str> = hits.iter().map(|m| m.source.as_str()).collect();
        assert_eq!(sources, vec!["a.txt", "c.txt", "d.txt", "b.txt"]);
        assert!(hits
            .windows(2)
            .all(|pair| pair[0].similarity >= pair[1].similarity));
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[1].id, 3);
    }

    #[tokio::test]
    async fn returns_at_most_k_and_at_most_stored() {
        let store = MemoryStore::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            store.insert(&record(name, &[1.0, 0.5])).await.unwrap();
        }
        assert_eq!(store.search(&query(&[1.0, 0.0]), 5).await.unwrap().len(), 3);
        assert_eq!(store.search(&query(&[1.0, 0.0]), 2).await.unwrap().len(), 2);
        assert!(store.search(&query(&[1.0, 0.0]), 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_records_are_skipped() {
        let store = MemoryStore::new();
        store.insert(&record(" ", &[1.0, 0.0])).await.unwrap();
        store.insert(&record("good.txt", &[1.0, 0.0])).await.unwrap();
        let hits = store.search(&query(&[1.0, 0.0]), 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "good.txt");
        assert_eq!(hits[0].id, 2);
    }

    #[tokio::test]
    async fn pins_dimensionality_on_first_insert() {
        let store = MemoryStore::new();
        assert_eq!(store.dimensions(), None);
        store.insert(&record("a.txt", &[1.0, 0.0])).await.unwrap();
        assert_eq!(store.dimensions(), Some(2));
        assert!(store
            .insert(&record("b.txt", &[1.0, 0.0, 0.0]))
            .await
            .is_err());
        assert!(store.search(&query(&[1.0, 0.0, 0.0]), 1).await.is_err());
        assert_eq!(store.len().await, 1);
    }
}
