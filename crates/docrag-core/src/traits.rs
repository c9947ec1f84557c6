use crate::error::Result;
use crate::types::{EmbeddingRecord, GenerationRequest, ScoredText};

/// Deterministic text → fixed-length vector mapping.
///
/// One embedder is used for the whole lifetime of a store; vectors from
/// different models must never be mixed in one table.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model (e.g. `bert:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::error::Error::Embedding("embedder returned no vector".into()))
    }
}

/// Nearest-neighbour store over [`EmbeddingRecord`]s, cosine metric.
pub trait VectorStore: Send + Sync {
    fn dim(&self) -> usize;
    /// Replace the whole store. Searches never observe a partial rebuild.
    fn rebuild(&self, records: &[EmbeddingRecord]) -> Result<()>;
    fn insert(&self, records: &[EmbeddingRecord]) -> Result<()>;
    /// Best-first hits; returns every record when `k` exceeds the store size.
    fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredText>>;
    fn count(&self) -> Result<usize>;

    /// Fingerprint of the corpus the store was last rebuilt from, if recorded.
    fn fingerprint(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn set_fingerprint(&self, _fingerprint: &str) -> Result<()> {
        Ok(())
    }
}

/// A language-model backend answering one prompt.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
