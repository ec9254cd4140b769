//! Timeout and retry wrappers around the external boundaries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::warn;

use crate::embedder::EmbeddingClient;
use crate::providers::CompletionClient;
use crate::record::{EmbeddingVector, Match, NewRecord, RecordId};
use crate::store::VectorStore;

/// Per-call deadline plus a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl CallPolicy {
    /// Runs `call` until it succeeds or attempts run out; a timed-out attempt counts as failed.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("{label} timed out after {:?}", self.timeout)),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts => {
                    warn!(attempt, "{label} failed, retrying: {err:#}");
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(err) => {
                    return Err(err.context(format!("{label} failed after {attempt} attempt(s)")))
                }
            }
        }
    }
}

/// Embedding client with the call policy applied.
pub struct GuardedEmbedder {
    inner: Arc<dyn EmbeddingClient>,
    policy: CallPolicy,
}

impl GuardedEmbedder {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn EmbeddingClient>, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl EmbeddingClient for GuardedEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<EmbeddingVector> {
        self.policy.run("embedding", || self.inner.embed(text)).await
    }

    fn dimensions(&self) -> Option<usize> {
        self.inner.dimensions()
    }
}

/// Vector store with the call policy applied.
///
/// A retried insert whose first attempt reached the store may leave a duplicate row.
pub struct GuardedStore {
    inner: Arc<dyn VectorStore>,
    policy: CallPolicy,
}

impl GuardedStore {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn VectorStore>, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl VectorStore for GuardedStore {
    async fn insert(&self, record: &NewRecord) -> anyhow::Result<RecordId> {
        self.policy.run("insert", || self.inner.insert(record)).await
    }

    async fn search(&self, query: &EmbeddingVector, k: usize) -> anyhow::Result<Vec<Match>> {
        self.policy
            .run("vector search", || self.inner.search(query, k))
            .await
    }

    fn dimensions(&self) -> Option<usize> {
        self.inner.dimensions()
    }
}

/// Completion client with the call policy applied.
pub struct GuardedCompletion {
    inner: Arc<dyn CompletionClient>,
    policy: CallPolicy,
}

impl GuardedCompletion {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn CompletionClient>, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CompletionClient for GuardedCompletion {
    async fn complete(
        &self,
        system_instruction: &str,
        user_question: &str,
    ) -> anyhow::Result<String> {
        self.policy
            .run("completion", || {
                self.inner.complete(system_instruction, user_question)
            })
            .await
    }
}
