use anyhow::{anyhow, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use intake_core::traits::Embedder;
use intake_core::types::ReferenceChunk;

use crate::schema::build_arrow_schema;
use crate::table::{open_db, table_dir};

const EMBED_BATCH: usize = 64;

/// Text that gets embedded for a chunk; the title is part of the vector.
pub fn embedding_text(chunk: &ReferenceChunk) -> String {
	format!("Title: {}\n\n{}", chunk.title, chunk.text)
}

/// Rebuilds the semantic table from scratch on every run.
pub struct VectorIndexer { db_dir: PathBuf, table_name: String, embedder: Arc<dyn Embedder> }

impl VectorIndexer {
	pub fn new(db_dir: PathBuf, table_name: &str, embedder: Arc<dyn Embedder>) -> Self {
		Self { db_dir, table_name: table_name.to_string(), embedder }
	}

	pub async fn index(&self, chunks: &[ReferenceChunk]) -> Result<usize> {
		if chunks.is_empty() { info!("no chunks to index"); return Ok(0); }
		std::fs::create_dir_all(&self.db_dir)?;
		let existing = table_dir(&self.db_dir, &self.table_name);
		if existing.exists() { std::fs::remove_dir_all(&existing)?; }

		let dim = i32::try_from(self.embedder.dim()).map_err(|_| anyhow!("embedding dim too large"))?;
		let pb = ProgressBar::new(chunks.len() as u64);
		pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}")?.progress_chars("#>-"));
		let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
		for batch in chunks.chunks(EMBED_BATCH) {
			let texts: Vec<String> = batch.iter().map(embedding_text).collect();
			let embedded = self.embedder.embed_batch(&texts).await?;
			if embedded.len() != texts.len() { return Err(anyhow!("embedder returned {} vectors for {} texts", embedded.len(), texts.len())); }
			if let Some(bad) = embedded.iter().find(|v| v.len() != self.embedder.dim()) {
				return Err(anyhow!("dim mismatch: got {} expected {}", bad.len(), self.embedder.dim()));
			}
			vectors.extend(embedded);
			pb.inc(batch.len() as u64);
		}
		pb.finish_with_message("embedded");

		let record_batch = to_record_batch(chunks, vectors, dim)?;
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		let db = open_db(&self.db_dir.to_string_lossy()).await?;
		db.create_table(&self.table_name, reader).execute().await?;
		info!(table = %self.table_name, chunks = chunks.len(), embedder = self.embedder.embedder_id(), "semantic index built");
		Ok(chunks.len())
	}
}

fn to_record_batch(chunks: &[ReferenceChunk], vectors: Vec<Vec<f32>>, dim: i32) -> Result<RecordBatch> {
	let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
	let titles: Vec<String> = chunks.iter().map(|c| c.title.clone()).collect();
	let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
	let vectors = vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>()));
	Ok(RecordBatch::try_new(build_arrow_schema(dim), vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(titles)),
		Arc::new(StringArray::from(texts)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
	])?)
}
