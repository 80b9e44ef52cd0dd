//! Embedding capability implementations.
//!
//! `HttpEmbedder` calls an OpenAI-compatible `/embeddings` endpoint.
//! `HashEmbedder` is deterministic and offline; `APP_USE_FAKE_EMBEDDINGS=1`
//! forces it regardless of config, for tests and development.

use anyhow::Result;

use intake_core::config::{secret_from_env, EmbeddingProvider, EmbeddingSettings};
use intake_core::traits::Embedder;

pub mod hash;
pub mod http;

pub use hash::HashEmbedder;
pub use http::HttpEmbedder;

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake || settings.provider == EmbeddingProvider::Hash {
        tracing::info!(dim = settings.dimensions, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(settings.dimensions)));
    }
    let api_key = secret_from_env(&settings.api_key_env)?;
    Ok(Box::new(HttpEmbedder::new(settings, api_key)?))
}
