//! LanceDB connection and column helpers.

use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use lancedb::{connect, Connection};
use std::path::Path;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// On-disk location of a local table, used to drop it before a rebuild.
pub fn table_dir(db_dir: &Path, name: &str) -> std::path::PathBuf {
    db_dir.join(format!("{name}.lance"))
}

pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{name} column missing or not utf8"))
}

pub fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a Float32Array> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<Float32Array>())
}

pub fn value_at(col: &StringArray, i: usize) -> String {
    if col.is_null(i) { String::new() } else { col.value(i).to_string() }
}
