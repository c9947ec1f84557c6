//! Domain types shared by ingestion, the vector stores and the query path.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A loaded source document.
///
/// - `id`: path relative to the source directory, `/`-separated
/// - `path`: original path on disk
/// - `text`: full decoded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub path: PathBuf,
    pub text: String,
}

/// A bounded slice of one document.
///
/// `start`/`end` are byte offsets into the parent document's text and
/// `text == document.text[start..end]`. `index` is the position within the
/// document; consecutive chunks overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// The persisted store schema: one row per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub text: String,
    pub vector: Vec<f32>,
    pub source: String,
    pub chunk_index: u32,
}

impl EmbeddingRecord {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            text: chunk.text.clone(),
            vector,
            source: chunk.doc_id.clone(),
            chunk_index: u32::try_from(chunk.index).unwrap_or(u32::MAX),
        }
    }
}

/// A single search hit. `score` is `1 - cosine_distance`; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredText {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// What a generation backend receives for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub prompt: String,
}
