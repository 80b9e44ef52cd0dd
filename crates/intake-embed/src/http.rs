use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use intake_core::config::EmbeddingSettings;
use intake_core::traits::Embedder;

/// OpenAI-compatible embeddings client. Requests a fixed `dimensions` so the
/// vectors match the table schema the corpus was ingested with.
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dim: usize,
    id: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let endpoint = format!("{}/embeddings", settings.base_url.trim_end_matches('/'));
        tracing::info!(endpoint = %endpoint, model = %settings.model, dim = settings.dimensions, "creating HTTP embedder");
        Ok(Self {
            client,
            endpoint,
            api_key,
            model: settings.model.clone(),
            dim: settings.dimensions,
            id: format!("http:{}:d{}", settings.model, settings.dimensions),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let request = json!({
            "model": self.model,
            "input": texts,
            "dimensions": self.dim,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Embedding request to {} timed out", self.endpoint)
                } else {
                    anyhow!("Embedding request to {} failed: {}", self.endpoint, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(endpoint = %self.endpoint, status = %status, "embedding API returned error");
            return Err(anyhow!("Embedding API error ({}): {}", status, body));
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(anyhow!("expected {} embeddings, got {}", texts.len(), parsed.data.len()));
        }
        parsed.data.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|item| item.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(anyhow!("embedding has {} dimensions, expected {}", bad.len(), self.dim));
        }
        Ok(vectors)
    }
}
