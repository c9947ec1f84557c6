//! Retrieval-augmented generation on top of the core traits: ingestion into a
//! vector store, prompt assembly and the interactive query loop.

pub mod context;
pub mod engine;
pub mod ingest;
pub mod prompt;
pub mod query_loop;

pub use context::AppContext;
pub use engine::{Answer, RagEngine};
pub use ingest::{IngestReport, Ingestor};
pub use prompt::{build_prompt, join_context};
pub use query_loop::{classify_input, Input, LoopState, QueryLoop};
