use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// `{id, title, text, vector}`; the vector width follows the embedder.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("title", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
