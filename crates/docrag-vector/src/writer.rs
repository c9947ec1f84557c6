use arrow_array::RecordBatch;

use docrag_core::error::{Error, Result};
use docrag_core::types::EmbeddingRecord;

use crate::table::records_to_batch;

/// Rows per Arrow batch handed to LanceDB.
const BATCH_ROWS: usize = 1000;

pub(crate) fn check_dims(records: &[EmbeddingRecord], dim: usize) -> Result<()> {
	for r in records {
		Error::check_dim(dim, r.vector.len())?;
	}
	Ok(())
}

pub(crate) fn to_batches(records: &[EmbeddingRecord], dim: usize) -> Result<Vec<RecordBatch>> {
	check_dims(records, dim)?;
	records
		.chunks(BATCH_ROWS)
		.map(|chunk| records_to_batch(chunk, dim).map_err(|e| Error::Store(format!("{e:#}"))))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(dim: usize) -> EmbeddingRecord {
		EmbeddingRecord { text: "t".into(), vector: vec![0.5; dim], source: "s".into(), chunk_index: 0 }
	}

	#[test]
	fn splits_into_bounded_batches() {
		let records: Vec<_> = (0..2500).map(|_| record(4)).collect();
		let batches = to_batches(&records, 4).unwrap();
		assert_eq!(batches.iter().map(|b| b.num_rows()).collect::<Vec<_>>(), vec![1000, 1000, 500]);
	}

	#[test]
	fn rejects_wrong_dimension() {
		let err = to_batches(&[record(4), record(3)], 4).unwrap_err();
		assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3 }));
	}
}
