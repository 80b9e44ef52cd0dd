//! Ticket record persistence: Airtable over REST, or an in-process map.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use intake_core::config::{secret_from_env, StoreProvider, StoreSettings};
use intake_core::error::Error;
use intake_core::traits::{Fields, RecordId, RecordStore};

pub const REQUEST_TYPE_FIELD: &str = "Request Type";
pub const REQUEST_DESCRIPTION_FIELD: &str = "Request Description";
pub const CHAT_HISTORY_FIELD: &str = "Chatbot Chat History";

pub struct AirtableStore {
    client: Client,
    table_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    fields: Fields,
}

#[derive(Deserialize)]
struct CreateResponse {
    records: Vec<AirtableRecord>,
}

impl AirtableStore {
    pub fn new(settings: &StoreSettings, api_key: String) -> Result<Self> {
        if settings.base_id.trim().is_empty() || settings.table_id.trim().is_empty() {
            return Err(Error::InvalidConfig("store.base_id and store.table_id are required for airtable".into()).into());
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let table_url = format!("{}/{}/{}", settings.base_url.trim_end_matches('/'), settings.base_id, settings.table_id);
        tracing::info!(table_url = %table_url, "creating airtable store");
        Ok(Self { client, table_url, api_key })
    }

    async fn checked(&self, what: &str, response: std::result::Result<Response, reqwest::Error>) -> Result<Response> {
        let response = response.map_err(|e| Error::Store(format!("{what} request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(table_url = %self.table_url, status = %status, what, "airtable returned error");
            return Err(Error::Store(format!("{what} returned {status}: {body}")).into());
        }
        Ok(response)
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn create(&self, fields: &Fields) -> Result<RecordId> {
        let sent = self
            .client
            .post(&self.table_url)
            .bearer_auth(&self.api_key)
            .json(&json!({"records": [{"fields": fields}]}))
            .send()
            .await;
        let parsed: CreateResponse = self.checked("create", sent).await?.json().await?;
        parsed
            .records
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| anyhow!(Error::Store("create returned no records".into())))
    }

    async fn update(&self, id: &str, fields: &Fields) -> Result<()> {
        let sent = self
            .client
            .patch(format!("{}/{id}", self.table_url))
            .bearer_auth(&self.api_key)
            .json(&json!({"fields": fields}))
            .send()
            .await;
        self.checked("update", sent).await?;
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Fields> {
        let sent = self.client.get(format!("{}/{id}", self.table_url)).bearer_auth(&self.api_key).send().await;
        let record: AirtableRecord = self.checked("read", sent).await?.json().await?;
        Ok(record.fields)
    }
}

/// Records live for the lifetime of the process. Updates merge fields.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<RecordId, Fields>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, fields: &Fields) -> Result<RecordId> {
        let id = format!("rec{:06}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.records.lock().await.insert(id.clone(), fields.clone());
        Ok(id)
    }

    async fn update(&self, id: &str, fields: &Fields) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(id).ok_or_else(|| Error::NotFound(format!("record {id}")))?;
        for (k, v) in fields {
            record.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Fields> {
        self.records
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("record {id}")).into())
    }
}

pub fn build_store(settings: &StoreSettings) -> Result<Arc<dyn RecordStore>> {
    match settings.provider {
        StoreProvider::Memory => {
            tracing::info!("using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreProvider::Airtable => {
            let api_key = secret_from_env(&settings.api_key_env)?;
            Ok(Arc::new(AirtableStore::new(settings, api_key)?))
        }
    }
}
