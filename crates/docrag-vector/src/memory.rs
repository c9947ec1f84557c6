//! Brute-force cosine store held in process memory.

use std::sync::RwLock;

use docrag_core::error::{Error, Result};
use docrag_core::traits::VectorStore;
use docrag_core::types::{EmbeddingRecord, ScoredText};

use crate::writer::check_dims;

pub struct InMemoryStore {
	dim: usize,
	records: RwLock<Vec<EmbeddingRecord>>,
	fingerprint: RwLock<Option<String>>,
}

impl InMemoryStore {
	pub fn new(dim: usize) -> Self {
		Self { dim, records: RwLock::new(Vec::new()), fingerprint: RwLock::new(None) }
	}
}

fn poisoned<T>(_: T) -> Error {
	Error::Store("in-memory store lock poisoned".into())
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
	if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

impl VectorStore for InMemoryStore {
	fn dim(&self) -> usize { self.dim }

	fn rebuild(&self, records: &[EmbeddingRecord]) -> Result<()> {
		check_dims(records, self.dim)?;
		let fresh = records.to_vec();
		*self.records.write().map_err(poisoned)? = fresh;
		Ok(())
	}

	fn insert(&self, records: &[EmbeddingRecord]) -> Result<()> {
		check_dims(records, self.dim)?;
		self.records.write().map_err(poisoned)?.extend_from_slice(records);
		Ok(())
	}

	fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredText>> {
		Error::check_dim(self.dim, query_vec.len())?;
		let records = self.records.read().map_err(poisoned)?;
		let mut hits: Vec<ScoredText> = records
			.iter()
			.map(|r| ScoredText { text: r.text.clone(), source: r.source.clone(), score: cosine_similarity(query_vec, &r.vector) })
			.collect();
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(k);
		Ok(hits)
	}

	fn count(&self) -> Result<usize> {
		Ok(self.records.read().map_err(poisoned)?.len())
	}

	fn fingerprint(&self) -> Result<Option<String>> {
		Ok(self.fingerprint.read().map_err(poisoned)?.clone())
	}

	fn set_fingerprint(&self, fingerprint: &str) -> Result<()> {
		*self.fingerprint.write().map_err(poisoned)? = Some(fingerprint.to_string());
		Ok(())
	}
}
