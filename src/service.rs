//! Question answering: validate, retrieve, compose.

use tracing::info;

use crate::compose::AnswerComposer;
use crate::error::{RagError, Result};
use crate::record::Answer;
use crate::retrieval::{Retriever, DEFAULT_TOP_K};

/// Runs the full query path for one question.
pub struct QueryService {
    retriever: Retriever,
    composer: AnswerComposer,
    top_k: usize,
}

impl QueryService {
    /// Service fetching [`DEFAULT_TOP_K`] matches per question.
    pub fn new(retriever: Retriever, composer: AnswerComposer) -> Self {
        Self {
            retriever,
            composer,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Overrides the number of matches used as context.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answers `question` from retrieved context.
    ///
    /// Blank questions fail validation before any embedding or completion call.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(RagError::Validation(
                "question must not be empty".to_string(),
            ));
        }
        let matches = self.retriever.retrieve(question, self.top_k).await?;
        info!(matches = matches.len(), "retrieved context");
        self.composer.compose(question, matches).await
    }
}
