//! intake-vector
//!
//! Semantic channel: reference chunks embedded into a LanceDB table and
//! searched by cosine similarity.

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::SemanticSearch;
pub use writer::{embedding_text, VectorIndexer};
