//! Retrieval fusion over the semantic and lexical readers.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use intake_core::config::Settings;
use intake_core::error::Error;
use intake_core::traits::{Embedder, Retriever};
use intake_core::types::{EvidenceBundle, RetrievalEntry, SourceChannel};
use intake_embed::get_default_embedder;
use intake_text::KeywordSearch;
use intake_vector::SemanticSearch;

pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";
pub const JOIN_SEPARATOR: &str = " + ";

pub struct Fusion {
    semantic: Arc<dyn Retriever>,
    lexical: Arc<dyn Retriever>,
    top_k_semantic: usize,
    top_k_keyword: usize,
    timeout: Duration,
}

impl Fusion {
    pub fn new(semantic: Arc<dyn Retriever>, lexical: Arc<dyn Retriever>) -> Self {
        Self { semantic, lexical, top_k_semantic: 2, top_k_keyword: 2, timeout: Duration::from_secs(30) }
    }

    pub fn with_top_k(mut self, semantic: usize, keyword: usize) -> Self {
        self.top_k_semantic = semantic;
        self.top_k_keyword = keyword;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wire both readers from settings, resolving index paths with `resolve`.
    pub async fn from_settings<F>(settings: &Settings, resolve: F) -> Result<Self>
    where
        F: Fn(&str) -> std::path::PathBuf,
    {
        let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
        let lancedb_dir = resolve(&settings.data.lancedb_dir);
        let semantic = SemanticSearch::new(&lancedb_dir.to_string_lossy(), &settings.data.table_name, embedder).await?;
        let lexical = KeywordSearch::new(resolve(&settings.data.keyword_index_dir));
        Ok(Self::new(Arc::new(semantic), Arc::new(lexical))
            .with_top_k(settings.retrieval.top_k_semantic, settings.retrieval.top_k_keyword)
            .with_timeout(Duration::from_secs(settings.retrieval.channel_timeout_secs)))
    }

    /// Query both channels concurrently and merge what they return. A channel
    /// that fails or times out contributes nothing and is listed in `degraded`.
    pub async fn fuse(&self, query_text: &str) -> EvidenceBundle {
        let (semantic, lexical) = tokio::join!(
            self.settle(self.semantic.as_ref(), query_text, self.top_k_semantic),
            self.settle(self.lexical.as_ref(), query_text, self.top_k_keyword),
        );
        let mut degraded = Vec::new();
        let semantic = semantic.unwrap_or_else(|channel| { degraded.push(channel); vec![] });
        let lexical = lexical.unwrap_or_else(|channel| { degraded.push(channel); vec![] });
        let mut bundle = combine_results(&semantic, &lexical);
        bundle.degraded = degraded;
        debug!(
            semantic = semantic.len(),
            lexical = lexical.len(),
            kept = bundle.total_chunk_count,
            titles = %bundle.combined_title,
            "fusion"
        );
        bundle
    }

    async fn settle(&self, retriever: &dyn Retriever, query: &str, top_k: usize) -> std::result::Result<Vec<RetrievalEntry>, SourceChannel> {
        let channel = retriever.channel();
        if top_k == 0 {
            return Ok(vec![]);
        }
        match tokio::time::timeout(self.timeout, retriever.search(query, top_k)).await {
            Ok(Ok(hits)) => Ok(hits),
            Ok(Err(e)) => {
                warn!(%channel, error = %e, "retrieval channel failed; continuing without it");
                Err(channel)
            }
            Err(_) => {
                let e = Error::Timeout { what: format!("{channel} search"), secs: self.timeout.as_secs() };
                warn!(%channel, error = %e, "retrieval channel timed out; continuing without it");
                Err(channel)
            }
        }
    }
}

/// Merge two result lists. Semantic entries are always kept, in order; a
/// lexical entry is kept only if no kept entry has the same title.
pub fn combine_results(semantic: &[RetrievalEntry], lexical: &[RetrievalEntry]) -> EvidenceBundle {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept: Vec<&RetrievalEntry> = Vec::with_capacity(semantic.len() + lexical.len());
    for entry in semantic {
        seen.insert(entry.title.as_str());
        kept.push(entry);
    }
    for entry in lexical {
        if seen.insert(entry.title.as_str()) {
            kept.push(entry);
        }
    }
    EvidenceBundle {
        combined_id: kept.iter().map(|e| e.chunk_id.as_str()).collect::<Vec<_>>().join(JOIN_SEPARATOR),
        combined_title: kept.iter().map(|e| e.title.as_str()).collect::<Vec<_>>().join(JOIN_SEPARATOR),
        combined_text: kept
            .iter()
            .map(|e| format!("### {}\n{}", e.title, e.text))
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR),
        total_chunk_count: kept.len(),
        degraded: Vec::new(),
    }
}
