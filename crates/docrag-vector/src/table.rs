//! LanceDB connection and housekeeping helpers.
//!
//! Provides database open functions, record batch conversion, whole-table
//! overwrite/append, and a simple key/value metadata table.

use anyhow::{anyhow, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray, UInt32Array};
use arrow_schema::{ArrowError, Schema};
use chrono::Utc;
use lancedb::database::CreateTableMode;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::sync::Arc;

use docrag_core::types::EmbeddingRecord;

use crate::schema::{build_meta_schema, build_record_schema, vector_dim};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// Vector dimension of an existing table, `None` when the table is missing.
pub async fn table_dim(conn: &Connection, name: &str) -> Result<Option<usize>> {
    if !table_exists(conn, name).await? {
        return Ok(None);
    }
    let schema = conn.open_table(name).execute().await?.schema().await?;
    Ok(vector_dim(&schema))
}

pub fn records_to_batch(records: &[EmbeddingRecord], dim: usize) -> Result<RecordBatch> {
    let schema = build_record_schema(dim);
    let mut texts = Vec::with_capacity(records.len());
    let mut sources = Vec::with_capacity(records.len());
    let mut chunk_indices = Vec::with_capacity(records.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(records.len());
    for r in records {
        texts.push(r.text.as_str());
        sources.push(r.source.as_str());
        chunk_indices.push(r.chunk_index);
        vectors.push(Some(r.vector.iter().map(|&x| Some(x)).collect()));
    }
    let record_batch = RecordBatch::try_new(schema, vec![
        Arc::new(StringArray::from(texts)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim as i32)),
        Arc::new(StringArray::from(sources)),
        Arc::new(UInt32Array::from(chunk_indices)),
    ])?;
    Ok(record_batch)
}

fn reader_for(batches: Vec<RecordBatch>, schema: Arc<Schema>) -> Box<RecordBatchIterator<std::vec::IntoIter<Result<RecordBatch, ArrowError>>>> {
    let batches: Vec<Result<RecordBatch, ArrowError>> = batches.into_iter().map(Ok).collect();
    Box::new(RecordBatchIterator::new(batches.into_iter(), schema))
}

/// Replace `name` with exactly `batches` in a single overwrite commit.
///
/// Readers see either the previous table version or the complete new one.
pub async fn overwrite_table(conn: &Connection, name: &str, batches: Vec<RecordBatch>, dim: usize) -> Result<()> {
    let reader = reader_for(batches, build_record_schema(dim));
    conn.create_table(name, reader).mode(CreateTableMode::Overwrite).execute().await?;
    Ok(())
}

/// Append `batches`, creating the table on first use.
pub async fn append_records(conn: &Connection, name: &str, batches: Vec<RecordBatch>, dim: usize) -> Result<()> {
    let reader = reader_for(batches, build_record_schema(dim));
    if table_exists(conn, name).await? {
        conn.open_table(name).execute().await?.add(reader).execute().await?;
    } else {
        conn.create_table(name, reader).execute().await?;
    }
    Ok(())
}

pub async fn ensure_meta_table(conn: &Connection, name: &str) -> Result<()> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    // create empty table with 0 rows
    let reader = reader_for(Vec::new(), build_meta_schema());
    conn.create_table(name, reader).execute().await?;
    Ok(())
}

pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
    ensure_meta_table(conn, table).await?;
    let t = conn.open_table(table).execute().await?;
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(vec![key.to_string()])),
            Arc::new(StringArray::from(vec![value.to_string()])),
            Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
        ],
    )?;
    let reader = reader_for(vec![rb], build_meta_schema());
    // Upsert behavior via merge_insert: key is unique
    let mut mi = t.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    mi.execute(reader).await?;
    Ok(())
}

pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
    if !table_exists(conn, table).await? { return Ok(None); }
    let t = conn.open_table(table).execute().await?;
    let mut stream = t.query().only_if(format!("key = '{}'", key.replace('\'', "''"))).execute().await?;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        if batch.num_rows() == 0 { continue; }
        let val = batch
            .column_by_name("value")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow!("meta.value column missing"))?;
        return Ok(Some(val.value(0).to_string()));
    }
    Ok(None)
}
