//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use skillcoach::{
    AnswerComposer, CompletionClient, EmbeddingClient, EmbeddingVector, MemoryStore, NewRecord,
    QueryService, Retriever, VectorStore,
};
use tracing_subscriber::{fmt, EnvFilter};

pub const DIMS: usize = 8;

static TRACING_INIT: Once = Once::new();

/// Test-writer subscriber, honoring `RUST_LOG` (default `skillcoach=debug`).
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("skillcoach=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Bag-of-words vector: each word bumps one bucket chosen by its bytes.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut values = vec![0.0f32; DIMS];
    values[DIMS - 1] = 0.01;
    for word in text.split_whitespace() {
        let bucket = word.bytes().map(usize::from).sum::<usize>() % DIMS;
        values[bucket] += 1.0;
    }
    values
}

/// Deterministic embedder that counts calls and can be switched to fail.
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(!self.fail, "embedding service unavailable");
        EmbeddingVector::new(bag_of_words(text))
    }
}

/// Completion fake returning a canned reply and counting calls.
pub struct FakeCompletion {
    pub calls: AtomicUsize,
    pub reply: String,
}

impl FakeCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, _system: &str, _question: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Record whose embedding is given explicitly.
pub fn record(source: &str, chunk: &str, embedding: Vec<f32>) -> NewRecord {
    NewRecord {
        title: source.trim_end_matches(".txt").to_string(),
        source: source.to_string(),
        chunk: chunk.to_string(),
        sequence_index: 0,
        embedding: EmbeddingVector::new(embedding).expect("valid embedding"),
    }
}

/// Store seeded with one record per `(source, chunk)`, embedded by [`bag_of_words`].
pub async fn seeded_store(docs: &[(&str, &str)]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (source, chunk) in docs {
        store
            .insert(&record(source, chunk, bag_of_words(chunk)))
            .await
            .expect("insert");
    }
    store
}

pub fn service(
    embedder: Arc<FakeEmbedder>,
    store: Arc<MemoryStore>,
    completion: Arc<FakeCompletion>,
    top_k: usize,
) -> QueryService {
    QueryService::new(
        Retriever::new(embedder, store),
        AnswerComposer::new(completion),
    )
    .with_top_k(top_k)
}
