//! Process-wide wiring: settings plus the embedder and store handles every
//! command shares. Built once at startup and passed down explicitly.

use std::sync::Arc;

use anyhow::{Context, Result};

use docrag_core::chunker::Chunker;
use docrag_core::config::Settings;
use docrag_core::data_processor::DataProcessor;
use docrag_core::traits::{Embedder, Generator, VectorStore};
use docrag_vector::{InMemoryStore, LanceStore};

use crate::engine::RagEngine;
use crate::ingest::{IngestReport, Ingestor};
use crate::query_loop::QueryLoop;

pub struct AppContext {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl AppContext {
    /// Load the configured embedder and open the configured store.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let embedder: Arc<dyn Embedder> = Arc::from(docrag_embed::get_default_embedder(&settings.embedding)?);
        let dim = embedder.dim();
        let store: Arc<dyn VectorStore> = if settings.store.in_memory {
            tracing::info!(dim, "using in-memory vector store");
            Arc::new(InMemoryStore::new(dim))
        } else {
            let path = settings.store.store_path();
            let store = LanceStore::open(&path, &settings.store.table, dim)
                .with_context(|| format!("opening vector store at {}", path.display()))?;
            Arc::new(store)
        };
        tracing::info!(embedder = embedder.id(), dim, "application context ready");
        Ok(Self { settings, embedder, store })
    }

    pub fn with_components(settings: Settings, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { settings, embedder, store }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn ingestor(&self) -> Result<Ingestor> {
        let chunker = Chunker::new(self.settings.chunking)?;
        Ok(Ingestor::new(self.embedder.clone(), self.store.clone(), chunker)
            .with_processor(DataProcessor::new(&self.settings.data.extensions))
            .with_batch_size(self.settings.embedding.batch_size)
            .skip_unchanged(self.settings.ingest.skip_unchanged))
    }

    /// Ingest the configured source directory.
    pub fn ingest(&self, show_progress: bool) -> Result<IngestReport> {
        let source = self.settings.data.source_path();
        let report = self
            .ingestor()?
            .show_progress(show_progress)
            .run(&source)
            .with_context(|| format!("ingesting {}", source.display()))?;
        Ok(report)
    }

    pub fn engine(&self, generator: Arc<dyn Generator>) -> Result<RagEngine> {
        Ok(RagEngine::new(self.embedder.clone(), self.store.clone(), generator)?
            .with_top_k(self.settings.retrieval.top_k)
            .with_delimiter(self.settings.retrieval.delimiter.clone())
            .with_system_instruction(self.settings.generation.system_instruction.clone()))
    }

    /// Engine backed by the configured generation provider.
    pub fn configured_engine(&self) -> Result<RagEngine> {
        let generator: Arc<dyn Generator> = Arc::from(docrag_llm::build_generator(&self.settings.generation)?);
        tracing::info!(backend = generator.name(), model = %self.settings.generation.model, "generation backend ready");
        self.engine(generator)
    }

    pub fn query_loop<'a>(&self, engine: &'a RagEngine) -> QueryLoop<'a> {
        QueryLoop::new(engine)
            .with_exit_words(self.settings.chat.exit_commands.clone())
            .with_prompt(self.settings.chat.prompt.clone())
    }
}
