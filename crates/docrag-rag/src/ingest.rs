//! Source directory → chunks → embeddings → store rebuild.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use docrag_core::chunker::Chunker;
use docrag_core::data_processor::{corpus_fingerprint, DataProcessor, LoadFailure};
use docrag_core::error::{Error, Result};
use docrag_core::traits::{Embedder, VectorStore};
use docrag_core::types::{Chunk, EmbeddingRecord};

#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents that contributed at least one chunk.
    pub documents: usize,
    /// Blank documents, or ones that produced no chunks.
    pub skipped: usize,
    pub failures: Vec<LoadFailure>,
    pub chunks: usize,
    pub fingerprint: String,
    /// The store already held this corpus and was left untouched.
    pub reused: bool,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    processor: DataProcessor,
    chunker: Chunker,
    batch_size: usize,
    skip_unchanged: bool,
    show_progress: bool,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, chunker: Chunker) -> Self {
        Self {
            embedder,
            store,
            processor: DataProcessor::default(),
            chunker,
            batch_size: 32,
            skip_unchanged: false,
            show_progress: false,
        }
    }

    pub fn with_processor(mut self, processor: DataProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Rebuild the store from every loadable document under `source_dir`.
    ///
    /// Nothing is written unless every chunk embeds successfully.
    pub fn run(&self, source_dir: &Path) -> Result<IngestReport> {
        let start = Instant::now();
        Error::check_dim(self.store.dim(), self.embedder.dim())?;

        let outcome = self.processor.load_dir(source_dir)?;
        let mut report = IngestReport {
            fingerprint: corpus_fingerprint(&outcome.documents, self.embedder.id(), self.chunker.config()),
            failures: outcome.failures,
            ..IngestReport::default()
        };

        if self.skip_unchanged && self.store_is_current(&report.fingerprint)? {
            report.reused = true;
            report.documents = outcome.documents.len();
            report.chunks = self.store.count()?;
            tracing::info!(chunks = report.chunks, "corpus unchanged; reusing existing store");
            return Ok(report);
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        for doc in &outcome.documents {
            let doc_chunks = self.chunker.chunk_document(doc);
            if doc_chunks.is_empty() {
                tracing::debug!(doc = %doc.id, "skipping blank document");
                report.skipped += 1;
                continue;
            }
            report.documents += 1;
            chunks.extend(doc_chunks);
        }
        report.chunks = chunks.len();

        let records = self.embed_chunks(&chunks)?;
        self.store.rebuild(&records)?;
        self.store.set_fingerprint(&report.fingerprint)?;

        tracing::info!(
            documents = report.documents,
            skipped = report.skipped,
            failures = report.failures.len(),
            chunks = report.chunks,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ingestion complete"
        );
        Ok(report)
    }

    fn store_is_current(&self, fingerprint: &str) -> Result<bool> {
        let stored = self.store.fingerprint()?;
        Ok(stored.as_deref() == Some(fingerprint) && self.store.count()? > 0)
    }

    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddingRecord>> {
        let pb = self.progress_bar(chunks.len());
        let dim = self.embedder.dim();
        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                Error::check_dim(dim, vector.len())?;
                records.push(EmbeddingRecord::from_chunk(chunk, vector));
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedded");
        Ok(records)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}
