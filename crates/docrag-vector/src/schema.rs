//! Arrow schemas for the record and meta tables.

use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const TEXT_COL: &str = "text";
pub const VECTOR_COL: &str = "vector";
pub const SOURCE_COL: &str = "source";
pub const CHUNK_INDEX_COL: &str = "chunk_index";
pub const DISTANCE_COL: &str = "_distance";

/// `text`, `vector` (fixed `dim`), `source`, `chunk_index`.
pub fn build_record_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(TEXT_COL, DataType::Utf8, false),
		Field::new(VECTOR_COL, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
		Field::new(SOURCE_COL, DataType::Utf8, false),
		Field::new(CHUNK_INDEX_COL, DataType::UInt32, false),
	]))
}

// Simple key/value table for run bookkeeping such as corpus fingerprints
pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}

/// Dimension of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR_COL).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
		_ => None,
	}
}
