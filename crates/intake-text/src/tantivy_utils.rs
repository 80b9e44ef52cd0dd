use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RegexTokenizer, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "keyword_lower";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	let indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqs);
	let text_options = TextOptions::default().set_indexing_options(indexing).set_stored();
	schema_builder.add_text_field("title", text_options.clone());
	schema_builder.add_text_field("text", text_options);
	schema_builder.build()
}

/// Word-character terms (`\w+`, so `key_art` stays whole), lowercased, with no
/// stop-word filtering. Must split the same way as [`crate::query_tokens`].
pub fn register_tokenizer(index: &Index) -> tantivy::Result<()> {
	let tokenizer = TextAnalyzer::builder(RegexTokenizer::new(r"\w+")?)
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
	Ok(())
}
