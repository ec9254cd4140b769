//! Word-window chunking for corpus documents.

use serde::Serialize;

use crate::error::{RagError, Result};

/// Default window length in words.
pub const DEFAULT_CHUNK_WORDS: usize = 800;
/// Default number of words shared by consecutive windows.
pub const DEFAULT_OVERLAP_WORDS: usize = 100;

/// Window sizing, validated so the window start always advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Builds a config; requires `0 < chunk_size` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::config("chunk size must be at least one word"));
        }
        if overlap >= chunk_size {
            return Err(RagError::config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Window length in words.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Words shared by consecutive windows.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_WORDS,
            overlap: DEFAULT_OVERLAP_WORDS,
        }
    }
}

/// Word window extracted from one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Filename stem of the source document.
    pub title: String,
    /// Source filename.
    pub source: String,
    /// Window words joined by single spaces.
    pub text: String,
    /// Zero-based position among the document's chunks.
    pub sequence_index: usize,
}

/// Splits `text` on whitespace into overlapping windows.
///
/// The window start advances by `chunk_size - overlap` words and stops once a
/// window reaches the end of the text, so the last window may be short.
/// Whitespace-only input produces no windows.
pub fn chunk_words(text: &str, config: &ChunkConfig) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut windows = Vec::new();
    let mut start = 0usize;
    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        windows.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += config.stride();
    }
    windows
}

/// Chunks a whole document, attaching provenance and sequence indices.
pub fn chunk_document(title: &str, source: &str, text: &str, config: &ChunkConfig) -> Vec<Chunk> {
    chunk_words(text, config)
        .into_iter()
        .enumerate()
        .map(|(sequence_index, text)| Chunk {
            title: title.to_string(),
            source: source.to_string(),
            text,
            sequence_index,
        })
        .collect()
}
