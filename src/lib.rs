#![warn(missing_docs)]
//! Core library for skillcoach, a retrieval-augmented mental-skills coach.
//!
//! Ingestion chunks a directory of plain-text documents, embeds every chunk,
//! and stores it in a pgvector table. At query time a question is embedded,
//! its nearest chunks are fetched, and a language model answers using only
//! that context.

pub mod api;
pub mod chunker;
pub mod compose;
pub mod config;
pub mod conversation;
pub mod embedder;
pub mod error;
pub mod ingest;
pub mod providers;
pub mod record;
pub mod resilience;
pub mod retrieval;
pub mod service;
pub mod store;
pub mod telemetry;

pub use chunker::{chunk_document, chunk_words, Chunk, ChunkConfig};
pub use compose::AnswerComposer;
pub use embedder::EmbeddingClient;
pub use error::{RagError, Result};
pub use ingest::{IngestReport, IngestionPipeline};
pub use providers::CompletionClient;
pub use record::{Answer, EmbeddingVector, Match, NewRecord, RecordId};
pub use resilience::CallPolicy;
pub use retrieval::Retriever;
pub use service::QueryService;
pub use store::{MemoryStore, PgVectorStore, TableName, VectorStore};
