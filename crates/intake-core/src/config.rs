//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_LLM__MODEL`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against the directory
//! the config was loaded from.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: dir.to_path_buf() };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// All sections as one typed value.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn resolve_path<S: AsRef<str>>(&self, p: S) -> PathBuf {
        resolve_with_base(&self.base_dir, p)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        if matches!(env, "prod" | "production") {
            let store: StoreProvider = self.get("store.provider")?;
            if store == StoreProvider::Memory {
                return Err(Error::InvalidConfig("store.provider = \"memory\" is not allowed in production".into()).into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub classifier: ClassifierSettings,
    pub store: StoreSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.retrieval.top_k_semantic == 0 && self.retrieval.top_k_keyword == 0 {
            return Err(Error::InvalidConfig("at least one retrieval channel needs top_k > 0".into()));
        }
        if self.classifier.confidence_floor > 100 {
            return Err(Error::InvalidConfig(format!(
                "classifier.confidence_floor must be within 0..=100, got {}",
                self.classifier.confidence_floor
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(Error::InvalidConfig("embedding.dimensions must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub corpus_dir: String,
    pub keyword_index_dir: String,
    pub lancedb_dir: String,
    pub table_name: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            corpus_dir: "data/corpus".to_string(),
            keyword_index_dir: "data/indexes/keyword".to_string(),
            lancedb_dir: "data/indexes/lancedb".to_string(),
            table_name: "rag_chunks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k_semantic: usize,
    pub top_k_keyword: usize,
    pub channel_timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k_semantic: 2, top_k_keyword: 2, channel_timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Http,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Http,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 512,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Sent only when set; some models accept nothing but their default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-5-nano".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Confidence at or below this value is rejected.
    pub confidence_floor: u8,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self { confidence_floor: 60 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    Airtable,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub provider: StoreProvider,
    pub base_url: String,
    pub base_id: String,
    pub table_id: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            provider: StoreProvider::Memory,
            base_url: "https://api.airtable.com/v0".to_string(),
            base_id: String::new(),
            table_id: String::new(),
            api_key_env: "AIRTABLE_API_KEY".to_string(),
            timeout_secs: 20,
        }
    }
}

/// Read a secret from the environment variable named in config.
pub fn secret_from_env(var: &str) -> Result<String, Error> {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::InvalidConfig(format!("environment variable {var} is not set")))
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
