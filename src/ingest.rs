//! Offline corpus ingestion: read, chunk, embed, insert.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::chunker::{chunk_document, Chunk, ChunkConfig};
use crate::embedder::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::record::{NewRecord, RecordId};
use crate::store::VectorStore;

/// Outcome of one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Corpus files visited.
    pub files: usize,
    /// Chunks produced by the chunker.
    pub chunks: usize,
    /// Chunks embedded and stored.
    pub inserted: usize,
    /// Items that failed and were skipped.
    pub failures: Vec<RagError>,
}

impl IngestReport {
    fn absorb(&mut self, other: IngestReport) {
        self.files += other.files;
        self.chunks += other.chunks;
        self.inserted += other.inserted;
        self.failures.extend(other.failures);
    }
}

/// Populates a vector store from a directory of plain-text documents.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    config: ChunkConfig,
    concurrency: usize,
}

impl IngestionPipeline {
    /// Sequential pipeline with the given chunking.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        config: ChunkConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
            concurrency: 1,
        }
    }

    /// Embeds and inserts up to `concurrency` chunks at once.
    ///
    /// Insertion order follows chunk order only at concurrency 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Ingests every regular file directly inside `dir`, in filename order.
    ///
    /// Per-file and per-chunk failures are logged and collected; an unreadable
    /// directory fails the whole run.
    pub async fn ingest(&self, dir: &Path) -> Result<IngestReport> {
        let files = list_corpus(dir).await?;
        info!(directory = %dir.display(), "corpus listed");
        Ok(self.ingest_files(files).await)
    }

    /// Ingests the given files in order, typically the output of [`list_corpus`].
    pub async fn ingest_files(&self, files: Vec<PathBuf>) -> IngestReport {
        info!(files = files.len(), "starting ingestion");
        let mut report = IngestReport::default();
        for path in files {
            let (title, source) = document_names(&path);
            report.files += 1;
            let text = match tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))
            {
                Ok(text) => text,
                Err(cause) => {
                    let failure = RagError::IngestionItem {
                        document: source,
                        sequence_index: None,
                        cause,
                    };
                    warn!("{failure}");
                    report.failures.push(failure);
                    continue;
                }
            };
            report.absorb(self.ingest_document(&title, &source, &text).await);
        }
        info!(
            files = report.files,
            chunks = report.chunks,
            inserted = report.inserted,
            failed = report.failures.len(),
            "ingestion complete"
        );
        report
    }

    /// Chunks one document and stores every chunk that embeds and inserts cleanly.
    pub async fn ingest_document(&self, title: &str, source: &str, text: &str) -> IngestReport {
        let chunks: Vec<Chunk> = chunk_document(title, source, text, &self.config);
        info!(source, chunks = chunks.len(), "ingesting document");
        let mut report = IngestReport {
            chunks: chunks.len(),
            ..IngestReport::default()
        };
        let mut outcomes = stream::iter(chunks)
            .map(|chunk| self.ingest_chunk(chunk))
            .buffer_unordered(self.concurrency);
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(_) => report.inserted += 1,
                Err(failure) => {
                    warn!("{failure}");
                    report.failures.push(failure);
                }
            }
        }
        report
    }

    async fn ingest_chunk(&self, chunk: Chunk) -> Result<RecordId> {
        let embedding = match self.embedder.embed(&chunk.text).await {
            Ok(embedding) => embedding,
            Err(err) => {
                return Err(RagError::IngestionItem {
                    document: chunk.source,
                    sequence_index: Some(chunk.sequence_index),
                    cause: err.context("embedding failed"),
                })
            }
        };
        let record = NewRecord::from_chunk(chunk, embedding);
        match self.store.insert(&record).await {
            Ok(id) => {
                debug!(id, source = %record.source, index = record.sequence_index, "stored chunk");
                Ok(id)
            }
            Err(err) => Err(RagError::IngestionItem {
                document: record.source,
                sequence_index: Some(record.sequence_index),
                cause: err.context("insert failed"),
            }),
        }
    }
}

/// Regular files directly inside `dir`, sorted by filename.
pub async fn list_corpus(dir: &Path) -> Result<Vec<PathBuf>> {
    let unreadable = |err: std::io::Error| {
        RagError::config(format!(
            "cannot read corpus directory {}: {err}",
            dir.display()
        ))
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => debug!(path = %path.display(), "skipping non-file entry"),
            Err(err) => warn!(path = %path.display(), "skipping unreadable entry: {err}"),
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// `(title, source)` for a corpus path: filename stem and full filename.
pub fn document_names(path: &Path) -> (String, String) {
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.clone());
    (title, source)
}
