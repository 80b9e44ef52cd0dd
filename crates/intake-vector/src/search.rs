use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::sync::Arc;
use tracing::debug;

use intake_core::error::{Error, Result};
use intake_core::traits::{Embedder, Retriever};
use intake_core::types::{RetrievalEntry, SourceChannel};

use crate::table::{float_column, open_db, string_column, table_exists, value_at};

/// Cosine nearest-neighbour reader over the table written by [`crate::VectorIndexer`].
pub struct SemanticSearch { db: Connection, table_name: String, embedder: Arc<dyn Embedder> }

impl SemanticSearch {
	pub async fn new(db_uri: &str, table_name: &str, embedder: Arc<dyn Embedder>) -> anyhow::Result<Self> {
		let db = open_db(db_uri).await?;
		Ok(Self { db, table_name: table_name.to_string(), embedder })
	}

	async fn run(&self, query_text: &str, top_k: usize) -> anyhow::Result<Vec<RetrievalEntry>> {
		if !table_exists(&self.db, &self.table_name).await? {
			anyhow::bail!("table '{}' does not exist", self.table_name);
		}
		let query_vec = self.embedder.embed(query_text).await?;
		let table = self.db.open_table(&self.table_name).execute().await?;
		let mut stream = table.vector_search(query_vec)?.distance_type(DistanceType::Cosine).limit(top_k).execute().await?;
		let mut hits = Vec::new();
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
			let ids = string_column(&batch, "id")?;
			let titles = string_column(&batch, "title")?;
			let texts = string_column(&batch, "text")?;
			let distances = float_column(&batch, "_distance");
			for i in 0..batch.num_rows() {
				let score = distances.map_or(0.0, |d| 1.0 - d.value(i));
				hits.push(RetrievalEntry { chunk_id: value_at(ids, i), title: value_at(titles, i), text: value_at(texts, i), score, source: SourceChannel::Semantic });
			}
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
		hits.truncate(top_k);
		debug!(hits = hits.len(), "semantic search");
		Ok(hits)
	}
}

#[async_trait]
impl Retriever for SemanticSearch {
	fn channel(&self) -> SourceChannel { SourceChannel::Semantic }

	async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalEntry>> {
		if query.trim().is_empty() || top_k == 0 { return Ok(vec![]); }
		self.run(query, top_k).await.map_err(|e| Error::index_unavailable(SourceChannel::Semantic, e))
	}
}
