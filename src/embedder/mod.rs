//! Embedding service boundary.

use async_trait::async_trait;

use crate::record::EmbeddingVector;

pub mod openai;

pub use openai::OpenAiEmbedder;

/// Converts text into a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embeds a single text.
    async fn embed(&self, text: &str) -> anyhow::Result<EmbeddingVector>;

    /// Dimensionality this client is pinned to, when known up front.
    fn dimensions(&self) -> Option<usize> {
        None
    }
}
