//! Session-only chat transcript for the terminal client.

use std::fmt;

use crate::record::{Answer, Match};

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The person asking.
    User,
    /// The coach's reply.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("you"),
            Role::Assistant => f.write_str("coach"),
        }
    }
}

/// One displayed message. Never persisted and never fed back into retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    /// Who spoke.
    pub role: Role,
    /// Text shown for the turn.
    pub content: String,
    /// Sources backing an assistant turn.
    pub sources: Vec<Match>,
}

/// Shown when the model returned no content.
pub const NO_ANSWER: &str = "No answer.";

/// Ordered turns of the current session.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the user's question.
    pub fn push_question(&mut self, question: &str) -> &ConversationTurn {
        self.push(ConversationTurn {
            role: Role::User,
            content: question.to_string(),
            sources: Vec::new(),
        })
    }

    /// Records an answer; an empty answer becomes [`NO_ANSWER`].
    pub fn push_answer(&mut self, answer: Answer) -> &ConversationTurn {
        let content = if answer.answer.trim().is_empty() {
            NO_ANSWER.to_string()
        } else {
            answer.answer
        };
        self.push(ConversationTurn {
            role: Role::Assistant,
            content,
            sources: answer.sources,
        })
    }

    /// Records a failed request so it reads differently from an empty answer.
    pub fn push_error(&mut self, message: &str) -> &ConversationTurn {
        self.push(ConversationTurn {
            role: Role::Assistant,
            content: format!("Error: {message}"),
            sources: Vec::new(),
        })
    }

    /// All turns so far.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    fn push(&mut self, turn: ConversationTurn) -> &ConversationTurn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }
}

/// Renders a turn plus its numbered sources for the terminal.
pub fn render_turn(turn: &ConversationTurn) -> String {
    let mut out = format!("{}> {}", turn.role, turn.content);
    if !turn.sources.is_empty() {
        out.push_str("\nsources:");
        for (idx, source) in turn.sources.iter().enumerate() {
            out.push_str(&format!(
                "\n  [{}] {} ({}) similarity {:.3}",
                idx + 1,
                source.title,
                source.source,
                source.similarity
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_answer_and_error_read_differently() {
        let mut transcript = Transcript::new();
        transcript.push_question("What is self-talk?");
        let empty = transcript
            .push_answer(Answer {
                answer: "  ".to_string(),
                sources: Vec::new(),
            })
            .content
            .clone();
        let failed = transcript.push_error("502 Bad Gateway").content.clone();
        assert_eq!(empty, "No answer.");
        assert_eq!(failed, "Error: 502 Bad Gateway");
        assert_eq!(transcript.turns().len(), 3);
        assert_eq!(transcript.turns()[0].role, Role::User);
    }

    #[test]
    fn renders_sources_with_similarity() {
        let turn = ConversationTurn {
            role: Role::Assistant,
            content: "Label the thought, then let it pass.".to_string(),
            sources: vec![Match {
                id: 4,
                title: "defusion".to_string(),
                source: "defusion.txt".to_string(),
                chunk: "...".to_string(),
                similarity: 0.8126,
            }],
        };
        assert_eq!(
            render_turn(&turn),
            "coach> Label the thought, then let it pass.\n\
             sources:\n  [1] defusion (defusion.txt) similarity 0.813"
        );
    }
}
