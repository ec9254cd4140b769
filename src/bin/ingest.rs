use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use skillcoach::config::{CallPolicyArgs, ChunkingArgs, DatabaseArgs, OpenAiArgs};
use skillcoach::ingest::list_corpus;
use skillcoach::resilience::GuardedStore;
use skillcoach::telemetry::init_tracing;
use skillcoach::{EmbeddingClient, IngestionPipeline, RagError, VectorStore};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "skillcoach-ingest",
    about = "Chunk, embed, and store a directory of mental-skills documents"
)]
struct IngestCli {
    /// Directory of plain-text corpus files (not searched recursively)
    #[arg(long, env = "SKILLCOACH_CORPUS_DIR", default_value = "data")]
    corpus_dir: PathBuf,

    /// Chunks embedded and inserted at once
    #[arg(long, env = "SKILLCOACH_INGEST_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    #[command(flatten)]
    openai: OpenAiArgs,

    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    chunking: ChunkingArgs,

    #[command(flatten)]
    calls: CallPolicyArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = IngestCli::parse();
    let chunk_config = cli.chunking.config()?;
    let files = list_corpus(&cli.corpus_dir).await?;
    let policy = cli.calls.policy();
    let embedder = cli.openai.embedder(policy)?;
    let mut store = cli.database.connect().await?;

    let dims = embedding_dimensions(embedder.as_ref()).await?;
    store.prepare(dims).await?;
    info!(
        table = %store.table().qualified(),
        dimensions = dims,
        "vector table ready"
    );

    let store: Arc<dyn VectorStore> = Arc::new(GuardedStore::new(Arc::new(store), policy));
    let pipeline = IngestionPipeline::new(embedder, store, chunk_config)
        .with_concurrency(cli.concurrency);
    let report = pipeline.ingest_files(files).await;

    for failure in &report.failures {
        warn!(kind = failure.kind(), "{failure}");
    }
    println!(
        "ingested {} chunk(s) from {} file(s); {} item(s) failed",
        report.inserted,
        report.files,
        report.failures.len()
    );
    Ok(())
}

/// Pinned dimension when configured, otherwise the length of a probe embedding.
async fn embedding_dimensions(embedder: &dyn EmbeddingClient) -> Result<usize, RagError> {
    if let Some(dims) = embedder.dimensions() {
        return Ok(dims);
    }
    let probe = embedder
        .embed("dimension probe")
        .await
        .map_err(|err| RagError::config(format!("could not determine embedding size: {err:#}")))?;
    Ok(probe.dimensions())
}
