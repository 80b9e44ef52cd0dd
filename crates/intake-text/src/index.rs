use anyhow::Result;
use std::path::PathBuf;
use tantivy::{doc, Index};
use tracing::info;

use intake_core::types::ReferenceChunk;

use crate::tantivy_utils::{build_schema, register_tokenizer};

/// Offline builder for the keyword index. Recreates the index directory.
pub struct KeywordIndexer {
	index: Index,
	id_field: tantivy::schema::Field,
	title_field: tantivy::schema::Field,
	text_field: tantivy::schema::Field,
}

impl KeywordIndexer {
	pub fn new(index_dir: PathBuf) -> Result<Self> {
		let schema = build_schema();
		if index_dir.exists() { std::fs::remove_dir_all(&index_dir)?; }
		std::fs::create_dir_all(&index_dir)?;
		let index = Index::create_in_dir(&index_dir, schema.clone())?;
		register_tokenizer(&index)?;
		let id_field = schema.get_field("id")?;
		let title_field = schema.get_field("title")?;
		let text_field = schema.get_field("text")?;
		Ok(Self { index, id_field, title_field, text_field })
	}

	pub fn index(&self, chunks: &[ReferenceChunk]) -> Result<usize> {
		let mut index_writer = self.index.writer(50_000_000)?;
		for c in chunks {
			index_writer.add_document(doc!(
				self.id_field => c.id.clone(),
				self.title_field => c.title.clone(),
				self.text_field => c.text.clone(),
			))?;
		}
		index_writer.commit()?;
		info!(chunks = chunks.len(), "keyword index committed");
		Ok(chunks.len())
	}
}
