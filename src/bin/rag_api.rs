use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use skillcoach::api::{router, QUERY_ROUTE};
use skillcoach::config::{CallPolicyArgs, CompletionArgs, DatabaseArgs, OpenAiArgs, RetrievalArgs};
use skillcoach::resilience::GuardedStore;
use skillcoach::telemetry::init_tracing;
use skillcoach::{AnswerComposer, QueryService, RagError, Retriever, VectorStore};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "skillcoach-api",
    about = "HTTP API answering mental-skills questions from the ingested corpus"
)]
struct ApiCli {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "SKILLCOACH_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    #[command(flatten)]
    openai: OpenAiArgs,

    #[command(flatten)]
    completion: CompletionArgs,

    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    retrieval: RetrievalArgs,

    #[command(flatten)]
    calls: CallPolicyArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = ApiCli::parse();
    let policy = cli.calls.policy();
    let top_k = cli.retrieval.top_k()?;
    let embedder = cli.openai.embedder(policy)?;
    let completion = cli.completion.completion(&cli.openai, policy)?;

    let store = cli.database.connect().await?;
    let table_dims = store.require_table()?;
    if let Some(dims) = embedder.dimensions() {
        if dims != table_dims {
            return Err(RagError::config(format!(
                "embedder produces {dims}-dimension vectors but {} stores {table_dims}",
                store.table().qualified()
            ))
            .into());
        }
    }
    let store: Arc<dyn VectorStore> = Arc::new(GuardedStore::new(Arc::new(store), policy));

    let retriever =
        Retriever::new(embedder, store).with_cache(cli.retrieval.embedding_cache_size);
    let service = QueryService::new(retriever, AnswerComposer::new(completion)).with_top_k(top_k);
    let app = router(Arc::new(service));

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("skillcoach-api listening on http://{addr}{QUERY_ROUTE}");
    axum::serve(listener, app)
        .await
        .context("server shutdown")?;
    Ok(())
}
