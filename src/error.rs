//! Error taxonomy shared by the ingestion and query paths.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T, E = RagError> = std::result::Result<T, E>;

/// Failures surfaced by the pipeline.
///
/// Boundary implementations (embedder, store, completion providers) report
/// `anyhow::Error`s; the pipeline wraps them into the variant matching the
/// boundary that failed.
#[derive(Debug, Error)]
pub enum RagError {
    /// Malformed inbound request; raised before any downstream call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The embedding service failed or returned an unusable vector.
    #[error("embedding request failed: {0:#}")]
    Embedding(#[source] anyhow::Error),

    /// The vector store query failed.
    #[error("vector search failed: {0:#}")]
    Retrieval(#[source] anyhow::Error),

    /// The language-model completion call failed.
    #[error("completion request failed: {0:#}")]
    Completion(#[source] anyhow::Error),

    /// One chunk (or one unreadable file) failed during ingestion.
    #[error("failed to ingest {document}{}: {cause:#}", chunk_label(.sequence_index))]
    IngestionItem {
        /// Source filename the failing item came from.
        document: String,
        /// Chunk position within the document, when the file itself was readable.
        sequence_index: Option<usize>,
        /// Underlying embedding, insert, or read failure.
        #[source]
        cause: anyhow::Error,
    },

    /// Missing or inconsistent settings; fatal before any work starts.
    #[error("configuration error: {0}")]
    Configuration(String),
}

fn chunk_label(sequence_index: &Option<usize>) -> String {
    sequence_index
        .as_ref()
        .map(|idx| format!(" chunk {idx}"))
        .unwrap_or_default()
}

impl RagError {
    /// Stable machine-readable label for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failure",
            Self::Embedding(_) => "embedding_failure",
            Self::Retrieval(_) => "retrieval_failure",
            Self::Completion(_) => "completion_failure",
            Self::IngestionItem { .. } => "ingestion_item_failure",
            Self::Configuration(_) => "configuration_failure",
        }
    }

    /// Shorthand for a configuration failure.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True when the caller sent something unusable.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True when an upstream collaborator (embedder, store, model) failed.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::Embedding(_) | Self::Retrieval(_) | Self::Completion(_)
        )
    }
}
