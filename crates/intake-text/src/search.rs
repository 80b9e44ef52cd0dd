use async_trait::async_trait;
use std::path::PathBuf;
use tantivy::collector::DocSetCollector;
use tantivy::query::{BooleanQuery, Occur, Query, RegexQuery};
use tantivy::schema::Value;
use tantivy::{Index, TantivyDocument};
use tracing::debug;

use intake_core::error::{Error, Result};
use intake_core::traits::Retriever;
use intake_core::types::{RetrievalEntry, SourceChannel};

use crate::tantivy_utils::register_tokenizer;

/// Keyword reader over the index written by [`crate::KeywordIndexer`].
///
/// The index is opened on every query, so a missing or rebuilt index is picked
/// up without restarting and surfaces as `IndexUnavailable` rather than a panic.
#[derive(Debug, Clone)]
pub struct KeywordSearch {
    index_dir: PathBuf,
}

impl KeywordSearch {
    pub fn new(index_dir: PathBuf) -> Self {
        Self { index_dir }
    }

    /// Synchronous search. Candidates are chunks where any query token occurs
    /// inside a title or body term; they are ranked by [`keyword_score`],
    /// ties broken by chunk id.
    pub fn search_blocking(&self, query_text: &str, top_k: usize) -> Result<Vec<RetrievalEntry>> {
        let tokens = query_tokens(query_text);
        if tokens.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }
        self.run(&tokens, top_k)
            .map_err(|e| Error::index_unavailable(SourceChannel::Lexical, format!("{}: {e}", self.index_dir.display())))
    }

    fn run(&self, tokens: &[String], top_k: usize) -> anyhow::Result<Vec<RetrievalEntry>> {
        let index = Index::open_in_dir(&self.index_dir)?;
        register_tokenizer(&index)?;
        let schema = index.schema();
        let id_field = schema.get_field("id")?;
        let title_field = schema.get_field("title")?;
        let text_field = schema.get_field("text")?;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(tokens.len() * 2);
        for token in tokens {
            let pattern = format!(".*{token}.*");
            clauses.push((Occur::Should, Box::new(RegexQuery::from_pattern(&pattern, title_field)?)));
            clauses.push((Occur::Should, Box::new(RegexQuery::from_pattern(&pattern, text_field)?)));
        }
        let query = BooleanQuery::new(clauses);

        let searcher = index.reader()?.searcher();
        let addresses = searcher.search(&query, &DocSetCollector)?;
        let mut hits = Vec::with_capacity(addresses.len());
        for addr in addresses {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let field = |f| doc.get_first(f).and_then(|v| v.as_str()).unwrap_or("").to_string();
            let (chunk_id, title, text) = (field(id_field), field(title_field), field(text_field));
            let score = keyword_score(tokens, &title, &text);
            hits.push(RetrievalEntry { chunk_id, title, text, score, source: SourceChannel::Lexical });
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
        hits.truncate(top_k);
        debug!(tokens = tokens.len(), hits = hits.len(), "keyword search");
        Ok(hits)
    }
}

#[async_trait]
impl Retriever for KeywordSearch {
    fn channel(&self) -> SourceChannel {
        SourceChannel::Lexical
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalEntry>> {
        let this = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || this.search_blocking(&query, top_k))
            .await
            .map_err(|e| Error::index_unavailable(SourceChannel::Lexical, e))?
    }
}

/// Case-folded word tokens (alphanumerics and `_`) longer than two
/// characters, in query order.
pub fn query_tokens(query_text: &str) -> Vec<String> {
    query_text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// `count(token in text) + 2 * count(token in title)`, summed over tokens,
/// counting non-overlapping case-folded substring occurrences.
#[allow(clippy::cast_precision_loss)]
pub fn keyword_score(tokens: &[String], title: &str, text: &str) -> f32 {
    let (title, text) = (title.to_lowercase(), text.to_lowercase());
    let total: usize = tokens
        .iter()
        .map(|t| text.matches(t.as_str()).count() + 2 * title.matches(t.as_str()).count())
        .sum();
    total as f32
}
