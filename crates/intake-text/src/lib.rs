//! intake-text
//!
//! Keyword (lexical) channel: a tantivy index of `{id, title, text}` reference
//! chunks, searched by case-folded substring overlap and scored by term counts.

pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use index::KeywordIndexer;
pub use search::{keyword_score, query_tokens, KeywordSearch};
