use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RetrievalEntry, SourceChannel};

pub type RecordId = String;
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Text-to-vector capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `http:text-embedding-3-small:d512`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// One retrieval channel. A fresh query per call; failures surface as
/// `Error::IndexUnavailable` so the caller can continue without this channel.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn channel(&self) -> SourceChannel;
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalEntry>>;
}

/// Raw text generation. `json_mode` asks the backend to constrain output to a
/// single JSON object; callers still treat the result as untrusted.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user: &str, json_mode: bool) -> anyhow::Result<String>;
}

/// Tabular persistence for ticket records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, fields: &Fields) -> anyhow::Result<RecordId>;
    async fn update(&self, id: &str, fields: &Fields) -> anyhow::Result<()>;
    async fn read(&self, id: &str) -> anyhow::Result<Fields>;
}
