use anyhow::{anyhow, Result};
use arrow_array::{Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};

use docrag_core::types::ScoredText;

use crate::schema::{DISTANCE_COL, SOURCE_COL, TEXT_COL};
use crate::table::table_exists;

/// Cosine k-NN over `table`; missing or empty tables yield no hits.
pub async fn nearest(conn: &Connection, table_name: &str, query_vec: &[f32], k: usize) -> Result<Vec<ScoredText>> {
	if k == 0 || !table_exists(conn, table_name).await? {
		return Ok(Vec::new());
	}
	let table = conn.open_table(table_name).execute().await?;
	if table.count_rows(None).await? == 0 {
		return Ok(Vec::new());
	}
	let mut stream = table
		.vector_search(query_vec.to_vec())?
		.distance_type(DistanceType::Cosine)
		.limit(k)
		.execute()
		.await?;
	let mut hits = Vec::new();
	while let Some(batch) = stream.try_next().await? {
		hits.extend(batch_to_hits(&batch)?);
	}
	hits.sort_by(|a, b| b.score.total_cmp(&a.score));
	hits.truncate(k);
	Ok(hits)
}

pub async fn count(conn: &Connection, table_name: &str) -> Result<usize> {
	if !table_exists(conn, table_name).await? {
		return Ok(0);
	}
	Ok(conn.open_table(table_name).execute().await?.count_rows(None).await?)
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| anyhow!("search result is missing '{}' column", name))
}

/// score = 1 - cosine distance
fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<ScoredText>> {
	let texts = string_col(batch, TEXT_COL)?;
	let sources = string_col(batch, SOURCE_COL)?;
	let distances = batch
		.column_by_name(DISTANCE_COL)
		.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
		.ok_or_else(|| anyhow!("search result is missing '{}' column", DISTANCE_COL))?;
	Ok((0..batch.num_rows())
		.map(|i| ScoredText {
			text: texts.value(i).to_string(),
			source: sources.value(i).to_string(),
			score: 1.0 - distances.value(i),
		})
		.collect())
}
