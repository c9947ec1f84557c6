//! Vector stores behind [`docrag_core::traits::VectorStore`]: a persistent
//! LanceDB table and an in-memory brute-force store.
//!
//! Both rank by cosine similarity (`score = 1 - cosine_distance`).

use std::path::Path;

use docrag_core::error::{Error, Result};
use docrag_core::traits::VectorStore;
use docrag_core::types::{EmbeddingRecord, ScoredText};
use lancedb::Connection;

pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
mod writer;

pub use memory::InMemoryStore;

pub const META_TABLE: &str = "meta";

fn store_err(e: anyhow::Error) -> Error {
	Error::Store(format!("{e:#}"))
}

/// A LanceDB table of [`EmbeddingRecord`]s in a local directory.
///
/// Owns a small tokio runtime and blocks on LanceDB's async API, so it must
/// not be driven from inside another tokio runtime.
pub struct LanceStore {
	runtime: tokio::runtime::Runtime,
	db: Connection,
	table_name: String,
	dim: usize,
}

impl LanceStore {
	pub fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let runtime = tokio::runtime::Builder::new_multi_thread()
			.worker_threads(2)
			.enable_all()
			.build()
			.map_err(|source| Error::Io { path: db_path.display().to_string(), source })?;
		let uri = db_path.to_string_lossy().to_string();
		let db = runtime.block_on(table::open_db(&uri)).map_err(store_err)?;
		let store = Self { runtime, db, table_name: table_name.to_string(), dim };
		if let Some(existing) = store.runtime.block_on(table::table_dim(&store.db, table_name)).map_err(store_err)? {
			if existing != dim {
				tracing::warn!(table = table_name, existing, dim, "stored vectors use a different dimension; rebuild before searching");
			}
		}
		tracing::debug!(uri = %uri, table = table_name, dim, "opened LanceDB store");
		Ok(store)
	}

	pub fn table_name(&self) -> &str {
		&self.table_name
	}

	pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
		self.runtime.block_on(table::set_meta(&self.db, META_TABLE, key, value)).map_err(store_err)
	}

	pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
		self.runtime.block_on(table::get_meta(&self.db, META_TABLE, key)).map_err(store_err)
	}

	fn fingerprint_key(&self) -> String {
		format!("fingerprint:{}", self.table_name)
	}

	fn check_table_dim(&self) -> Result<()> {
		match self.runtime.block_on(table::table_dim(&self.db, &self.table_name)).map_err(store_err)? {
			Some(existing) => Error::check_dim(self.dim, existing),
			None => Ok(()),
		}
	}
}

impl VectorStore for LanceStore {
	fn dim(&self) -> usize { self.dim }

	fn rebuild(&self, records: &[EmbeddingRecord]) -> Result<()> {
		let batches = writer::to_batches(records, self.dim)?;
		self.runtime
			.block_on(table::overwrite_table(&self.db, &self.table_name, batches, self.dim))
			.map_err(store_err)?;
		tracing::info!(table = %self.table_name, rows = records.len(), "rebuilt LanceDB table");
		Ok(())
	}

	fn insert(&self, records: &[EmbeddingRecord]) -> Result<()> {
		if records.is_empty() { return Ok(()); }
		self.check_table_dim()?;
		let batches = writer::to_batches(records, self.dim)?;
		self.runtime
			.block_on(table::append_records(&self.db, &self.table_name, batches, self.dim))
			.map_err(store_err)
	}

	fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredText>> {
		Error::check_dim(self.dim, query_vec.len())?;
		self.check_table_dim()?;
		self.runtime
			.block_on(search::nearest(&self.db, &self.table_name, query_vec, k))
			.map_err(store_err)
	}

	fn count(&self) -> Result<usize> {
		self.runtime.block_on(search::count(&self.db, &self.table_name)).map_err(store_err)
	}

	fn fingerprint(&self) -> Result<Option<String>> {
		self.get_meta(&self.fingerprint_key())
	}

	fn set_fingerprint(&self, fingerprint: &str) -> Result<()> {
		self.set_meta(&self.fingerprint_key(), fingerprint)
	}
}
