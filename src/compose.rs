//! Grounding prompt assembly and answer generation.

use std::sync::Arc;

use crate::error::{RagError, Result};
use crate::providers::CompletionClient;
use crate::record::{Answer, Match};

const COACH_INSTRUCTION: &str = "You are a careful mental skills coach. \
Use only the provided context from evidence-based resources. \
Do NOT give medical diagnoses or treatment plans. \
If the question is out of scope or requires a professional, say so and \
suggest the user talk to a licensed clinician.";

/// Renders matches into the context block, in the order received.
pub fn render_context(matches: &[Match]) -> String {
    matches
        .iter()
        .map(|m| {
            format!(
                "Title: {}\nSource: {}\nContent: {}",
                m.title, m.source, m.chunk
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Coaching rules followed by the context block.
pub fn system_instruction(context: &str) -> String {
    format!("{COACH_INSTRUCTION}\n\nContext:\n{context}")
}

/// Turns retrieved matches and a question into an [`Answer`].
pub struct AnswerComposer {
    completion: Arc<dyn CompletionClient>,
}

impl AnswerComposer {
    /// Composer backed by `completion`.
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Asks the model with the grounding prompt; every match comes back as a source.
    pub async fn compose(&self, question: &str, matches: Vec<Match>) -> Result<Answer> {
        let system = system_instruction(&render_context(&matches));
        let answer = self
            .completion
            .complete(&system, question)
            .await
            .map_err(RagError::Completion)?;
        Ok(Answer {
            answer,
            sources: matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
        reply: String,
    }

    #[async_trait]
    impl CompletionClient for Recorder {
        async fn complete(&self, system: &str, question: &str) -> anyhow::Result<String> {
            self.seen
                .lock()
                .await
                .push((system.to_string(), question.to_string()));
            Ok(self.reply.clone())
        }
    }

    struct Refusing;

    #[async_trait]
    impl CompletionClient for Refusing {
        async fn complete(&self, _system: &str, _question: &str) -> anyhow::Result<String> {
            anyhow::bail!("429 rate limited")
        }
    }

    fn sample(id: i64, source: &str, similarity: f64) -> Match {
        Match {
            id,
            title: source.trim_end_matches(".txt").to_string(),
            source: source.to_string(),
            chunk: format!("text from {source}"),
            similarity,
        }
    }

    #[test]
    fn context_keeps_received_order() {
        let context = render_context(&[sample(2, "b.txt", 0.9), sample(1, "a.txt", 0.8)]);
        assert_eq!(
            context,
            "Title: b\nSource: b.txt\nContent: text from b.txt\n\n\
             Title: a\nSource: a.txt\nContent: text from a.txt"
        );
    }

    #[test]
    fn instruction_carries_rules_then_context() {
        let system = system_instruction("Title: a");
        assert!(system.starts_with("You are a careful mental skills coach."));
        assert!(system.contains("Do NOT give medical diagnoses or treatment plans."));
        assert!(system.contains("licensed clinician"));
        assert!(system.ends_with("\n\nContext:\nTitle: a"));
    }

    #[tokio::test]
    async fn passes_question_verbatim_and_returns_all_sources() {
        let recorder = Arc::new(Recorder {
            reply: "Try box breathing.".to_string(),
            ..Recorder::default()
        });
        let composer = AnswerComposer::new(recorder.clone());
        let matches = vec![sample(3, "c.txt", 0.2), sample(1, "a.txt", -0.1)];
        let answer = composer
            .compose("  How do I calm down?  ", matches.clone())
            .await
            .unwrap();
        assert_eq!(answer.answer, "Try box breathing.");
        assert_eq!(answer.sources, matches);
        let seen = recorder.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "  How do I calm down?  ");
    }

    #[tokio::test]
    async fn empty_model_output_stays_empty() {
        let composer = AnswerComposer::new(Arc::new(Recorder::default()));
        let answer = composer.compose("q", Vec::new()).await.unwrap();
        assert_eq!(answer.answer, "");
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn completion_error_maps_to_completion_failure() {
        let composer = AnswerComposer::new(Arc::new(Refusing));
        let err = composer.compose("q", Vec::new()).await.unwrap_err();
        assert_eq!(err.kind(), "completion_failure");
    }
}
