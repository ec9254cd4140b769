//! Command-line and environment settings shared by the binaries.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::chunker::{ChunkConfig, DEFAULT_CHUNK_WORDS, DEFAULT_OVERLAP_WORDS};
use crate::embedder::{EmbeddingClient, OpenAiEmbedder};
use crate::error::{RagError, Result};
use crate::providers::{AnthropicProvider, CompletionClient, OpenAiProvider, SamplingParams};
use crate::resilience::{CallPolicy, GuardedCompletion, GuardedEmbedder};
use crate::store::{PgVectorStore, TableName};

/// Returns the value or a configuration failure naming the missing setting.
pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RagError::config(format!("{name} must be set"))),
    }
}

/// OpenAI credentials and embedding model.
#[derive(Args, Debug, Clone)]
pub struct OpenAiArgs {
    /// OpenAI API key used for embeddings (and completions with the openai provider)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL for the OpenAI-compatible API
    #[arg(
        long,
        env = "SKILLCOACH_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    pub openai_base_url: String,

    /// Embedding model identifier
    #[arg(
        long,
        env = "SKILLCOACH_EMBEDDING_MODEL",
        default_value = "text-embedding-3-small"
    )]
    pub embedding_model: String,

    /// Optional dimension override when supported by the model
    #[arg(long, env = "SKILLCOACH_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,
}

impl OpenAiArgs {
    /// Embedding client wrapped in the call policy.
    pub fn embedder(&self, policy: CallPolicy) -> Result<Arc<dyn EmbeddingClient>> {
        let key = require(&self.openai_api_key, "OPENAI_API_KEY")?;
        let embedder = OpenAiEmbedder::new(
            key,
            &self.openai_base_url,
            self.embedding_model.clone(),
            self.embedding_dimensions,
            policy.timeout,
        )
        .map_err(|err| RagError::config(format!("{err:#}")))?;
        Ok(Arc::new(GuardedEmbedder::new(Arc::new(embedder), policy)))
    }
}

/// Completion backend.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenAI chat completions.
    #[value(name = "openai")]
    OpenAi,
    /// Anthropic messages.
    Anthropic,
}

/// Answer-model settings.
#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    /// Target LLM provider
    #[arg(
        long,
        env = "SKILLCOACH_LLM_PROVIDER",
        value_enum,
        default_value_t = LlmProvider::OpenAi
    )]
    pub llm_provider: LlmProvider,

    /// OpenAI chat model used for answers
    #[arg(long, env = "SKILLCOACH_CHAT_MODEL", default_value = "gpt-4.1-mini")]
    pub chat_model: String,

    /// Anthropic API key (required when --llm-provider anthropic)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic model identifier
    #[arg(
        long,
        env = "SKILLCOACH_ANTHROPIC_MODEL",
        default_value = "claude-3-5-haiku-latest"
    )]
    pub anthropic_model: String,

    /// Sampling temperature for the answer model
    #[arg(long, env = "SKILLCOACH_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f32,

    /// Maximum tokens to request from the answer model
    #[arg(long, env = "SKILLCOACH_MAX_COMPLETION_TOKENS", default_value_t = 700)]
    pub max_completion_tokens: usize,
}

impl CompletionArgs {
    /// Completion client for the selected provider, wrapped in the call policy.
    pub fn completion(
        &self,
        openai: &OpenAiArgs,
        policy: CallPolicy,
    ) -> Result<Arc<dyn CompletionClient>> {
        let params = SamplingParams {
            temperature: self.temperature,
            max_tokens: self.max_completion_tokens.max(1),
        };
        let inner: Arc<dyn CompletionClient> = match self.llm_provider {
            LlmProvider::OpenAi => {
                let key = require(&openai.openai_api_key, "OPENAI_API_KEY")?;
                Arc::new(
                    OpenAiProvider::new(
                        key,
                        &openai.openai_base_url,
                        self.chat_model.clone(),
                        params,
                        policy.timeout,
                    )
                    .map_err(|err| RagError::config(format!("{err:#}")))?,
                )
            }
            LlmProvider::Anthropic => {
                let key = require(&self.anthropic_api_key, "ANTHROPIC_API_KEY")?;
                Arc::new(
                    AnthropicProvider::new(
                        key,
                        self.anthropic_model.clone(),
                        params,
                        policy.timeout,
                    )
                    .map_err(|err| RagError::config(format!("{err:#}")))?,
                )
            }
        };
        Ok(Arc::new(GuardedCompletion::new(inner, policy)))
    }
}

/// Postgres location of the chunk table.
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Postgres connection string (postgres://...)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Schema holding the chunk table
    #[arg(long, env = "SKILLCOACH_SCHEMA", default_value = "public")]
    pub schema: String,

    /// Table storing embedded chunks
    #[arg(long, env = "SKILLCOACH_TABLE", default_value = "mental_skills_chunks")]
    pub table: String,
}

impl DatabaseArgs {
    /// Validated table name.
    pub fn table_name(&self) -> Result<TableName> {
        TableName::new(self.schema.clone(), self.table.clone())
    }

    /// Opens the pgvector store.
    pub async fn connect(&self) -> Result<PgVectorStore> {
        let url = require(&self.database_url, "DATABASE_URL")?;
        PgVectorStore::connect(url, self.table_name()?).await
    }
}

/// Word-window sizing for ingestion.
#[derive(Args, Debug, Clone)]
pub struct ChunkingArgs {
    /// Words per chunk
    #[arg(long, env = "SKILLCOACH_CHUNK_WORDS", default_value_t = DEFAULT_CHUNK_WORDS)]
    pub chunk_words: usize,

    /// Words shared by consecutive chunks
    #[arg(long, env = "SKILLCOACH_CHUNK_OVERLAP", default_value_t = DEFAULT_OVERLAP_WORDS)]
    pub chunk_overlap: usize,
}

impl ChunkingArgs {
    /// Validated chunk configuration.
    pub fn config(&self) -> Result<ChunkConfig> {
        ChunkConfig::new(self.chunk_words, self.chunk_overlap)
    }
}

/// Query-time retrieval settings.
#[derive(Args, Debug, Clone)]
pub struct RetrievalArgs {
    /// Matches used as answer context
    #[arg(long, env = "SKILLCOACH_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Max cached question embeddings kept in memory (0 disables caching)
    #[arg(long, env = "SKILLCOACH_EMBEDDING_CACHE", default_value_t = 256)]
    pub embedding_cache_size: usize,
}

impl RetrievalArgs {
    /// Top-k, rejecting zero.
    pub fn top_k(&self) -> Result<usize> {
        if self.top_k == 0 {
            return Err(RagError::config("top-k must be at least 1"));
        }
        Ok(self.top_k)
    }
}

/// Timeout and retry budget for external calls.
#[derive(Args, Debug, Clone)]
pub struct CallPolicyArgs {
    /// Seconds before an embedding, store, or completion call times out
    #[arg(long, env = "SKILLCOACH_CALL_TIMEOUT_SECS", default_value_t = 30)]
    pub call_timeout_secs: u64,

    /// Attempts per external call (2 means one retry)
    #[arg(long, env = "SKILLCOACH_CALL_ATTEMPTS", default_value_t = 2)]
    pub call_attempts: usize,
}

impl CallPolicyArgs {
    /// Policy built from the flags.
    pub fn policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(self.call_timeout_secs.max(1)),
            max_attempts: self.call_attempts.max(1),
            ..CallPolicy::default()
        }
    }
}
