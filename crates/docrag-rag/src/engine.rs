//! One query in, one answer out: embed, search, prompt, generate.

use std::sync::Arc;
use std::time::Instant;

use docrag_core::config::{RetrievalSettings, DEFAULT_SYSTEM_INSTRUCTION};
use docrag_core::error::{Error, Result};
use docrag_core::traits::{Embedder, Generator, VectorStore};
use docrag_core::types::{GenerationRequest, ScoredText};

use crate::prompt::{build_prompt, join_context};

/// The generator's text plus what it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub hits: Vec<ScoredText>,
    pub context: String,
}

pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    top_k: usize,
    delimiter: String,
    system_instruction: String,
}

impl RagEngine {
    /// Fails when the embedder and the store disagree on dimension.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, generator: Arc<dyn Generator>) -> Result<Self> {
        Error::check_dim(store.dim(), embedder.dim())?;
        let retrieval = RetrievalSettings::default();
        Ok(Self {
            embedder,
            store,
            generator,
            top_k: retrieval.top_k,
            delimiter: retrieval.delimiter,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn retrieve(&self, query: &str) -> Result<Vec<ScoredText>> {
        let query_vec = self.embedder.embed_one(query)?;
        self.store.search(&query_vec, self.top_k)
    }

    pub fn answer(&self, query: &str) -> Result<Answer> {
        let start = Instant::now();
        let hits = self.retrieve(query)?;
        let context = join_context(&hits, &self.delimiter);
        if hits.is_empty() {
            tracing::warn!("no stored chunks matched; asking with an empty context");
        }
        let request = GenerationRequest {
            system_instruction: self.system_instruction.clone(),
            prompt: build_prompt(query, &context),
        };
        let text = self.generator.generate(&request)?;
        tracing::info!(
            hits = hits.len(),
            backend = self.generator.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "answered query"
        );
        Ok(Answer { text, hits, context })
    }
}
