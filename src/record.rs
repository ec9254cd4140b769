//! Record and match types exchanged with the vector store.

use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;

/// Store-assigned record identifier; ascending ids follow insertion order.
pub type RecordId = i64;

/// Fixed-length embedding produced by the embedding service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Wraps raw model output, rejecting empty or non-finite vectors.
    pub fn new(values: Vec<f32>) -> anyhow::Result<Self> {
        anyhow::ensure!(!values.is_empty(), "embedding vector is empty");
        anyhow::ensure!(
            values.iter().all(|v| v.is_finite()),
            "embedding vector contains non-finite values"
        );
        Ok(Self(values))
    }

    /// Number of components.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Borrowed view of the components.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Cosine similarity in [-1, 1]; `None` when dimensions differ or a vector has zero norm.
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> Option<f64> {
        let (a, b) = (self.as_slice(), other.as_slice());
        if a.len() != b.len() {
            return None;
        }
        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;
        for (&x, &y) in a.iter().zip(b.iter()) {
            let (x, y) = (f64::from(x), f64::from(y));
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom <= f64::EPSILON {
            return None;
        }
        Some((dot / denom).clamp(-1.0, 1.0))
    }
}

/// Row submitted to the vector store during ingestion (the store assigns the id).
#[derive(Debug, Clone, Serialize)]
pub struct NewRecord {
    /// Document title (filename stem).
    pub title: String,
    /// Source filename.
    pub source: String,
    /// Chunk text that was embedded.
    pub chunk: String,
    /// Zero-based chunk position within its source.
    pub sequence_index: usize,
    /// Embedding of `chunk`.
    pub embedding: EmbeddingVector,
}

impl NewRecord {
    /// Pairs a chunk with its embedding.
    pub fn from_chunk(chunk: Chunk, embedding: EmbeddingVector) -> Self {
        Self {
            title: chunk.title,
            source: chunk.source,
            chunk: chunk.text,
            sequence_index: chunk.sequence_index,
            embedding,
        }
    }
}

/// Nearest-neighbor query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Record identifier.
    pub id: RecordId,
    /// Document title.
    pub title: String,
    /// Source filename.
    pub source: String,
    /// Chunk text.
    pub chunk: String,
    /// Cosine similarity to the query vector.
    pub similarity: f64,
}

impl Match {
    /// Builds a match from raw store values, rejecting rows that violate the query contract.
    pub fn validated(
        id: RecordId,
        title: String,
        source: String,
        chunk: String,
        similarity: f64,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(id >= 0, "record id {id} is negative");
        anyhow::ensure!(
            similarity.is_finite(),
            "record {id} has non-finite similarity"
        );
        // pgvector distances carry float error at the extremes
        const SLACK: f64 = 1e-6;
        anyhow::ensure!(
            (-1.0 - SLACK..=1.0 + SLACK).contains(&similarity),
            "record {id} similarity {similarity} outside [-1, 1]"
        );
        anyhow::ensure!(!source.trim().is_empty(), "record {id} has no source");
        Ok(Self {
            id,
            title,
            source,
            chunk,
            similarity: similarity.clamp(-1.0, 1.0),
        })
    }
}

/// Grounded answer returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Model output, verbatim; empty when the model produced no content.
    pub answer: String,
    /// Every match used as context, in retrieval order.
    pub sources: Vec<Match>,
}
