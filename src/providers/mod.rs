//! Language-model completion boundary.

use async_trait::async_trait;

mod anthropic;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Trait implemented by concrete LLM providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Runs one completion with a system instruction and the user's question
    /// as separate roles. Returns an empty string when the model produced no
    /// content.
    async fn complete(&self, system_instruction: &str, user_question: &str)
        -> anyhow::Result<String>;
}

/// Sampling settings shared by the providers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
}

