#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use intake_core::error::Result as CoreResult;
use intake_core::traits::{Fields, Generator, RecordId, RecordStore, Retriever};
use intake_core::types::{RetrievalEntry, SourceChannel};
use intake_flow::{prompts, Assistant};
use intake_hybrid::Fusion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Classify,
    Chat,
    Summary,
    Answer,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: Kind,
    pub system: String,
    pub user: String,
    pub json_mode: bool,
}

/// Replays queued responses per prompt kind and records every call.
#[derive(Default)]
pub struct ScriptedGenerator {
    queues: Mutex<HashMap<Kind, VecDeque<Result<String, String>>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, kind: Kind, response: &str) -> &Self {
        self.queues.lock().unwrap().entry(kind).or_default().push_back(Ok(response.to_string()));
        self
    }

    pub fn push_err(&self, kind: Kind, error: &str) -> &Self {
        self.queues.lock().unwrap().entry(kind).or_default().push_back(Err(error.to_string()));
        self
    }

    pub fn classify(&self, label: &str, confidence: u8, summary: &str) -> &Self {
        self.push(
            Kind::Classify,
            &serde_json::json!({
                "result": label,
                "result_confidence": confidence,
                "result_explanation": "matched the reference section",
                "result_summary": summary,
            })
            .to_string(),
        )
    }

    pub fn intent(&self, intent: &str) -> &Self {
        self.push(Kind::Chat, &format!("{{\"user_response_type\": \"{intent}\"}}"))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: Kind) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }

    fn kind_of(system: &str) -> Kind {
        if system.starts_with(prompts::CLASSIFIER_SYSTEM_INTRO) {
            Kind::Classify
        } else if system.starts_with(prompts::CHAT_SYSTEM_INTRO) {
            Kind::Chat
        } else if system == prompts::SUMMARIZER_SYSTEM {
            Kind::Summary
        } else if system == prompts::ANSWER_SYSTEM {
            Kind::Answer
        } else {
            panic!("unexpected system prompt: {system}")
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, system: &str, user: &str, json_mode: bool) -> anyhow::Result<String> {
        let kind = Self::kind_of(system);
        self.calls.lock().unwrap().push(Call { kind, system: system.to_string(), user: user.to_string(), json_mode });
        let next = self.queues.lock().unwrap().get_mut(&kind).and_then(VecDeque::pop_front);
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => Err(anyhow::anyhow!("no scripted response for {kind:?}")),
        }
    }
}

pub struct FixedRetriever {
    pub channel: SourceChannel,
    pub entries: Vec<(String, String, String)>,
}

#[async_trait]
impl Retriever for FixedRetriever {
    fn channel(&self) -> SourceChannel {
        self.channel
    }

    async fn search(&self, _query: &str, top_k: usize) -> CoreResult<Vec<RetrievalEntry>> {
        Ok(self
            .entries
            .iter()
            .take(top_k)
            .map(|(id, title, text)| RetrievalEntry {
                chunk_id: id.clone(),
                title: title.clone(),
                text: text.clone(),
                score: 1.0,
                source: self.channel,
            })
            .collect())
    }
}

pub fn fusion_with(semantic: &[(&str, &str, &str)]) -> Arc<Fusion> {
    let entries = semantic.iter().map(|(a, b, c)| ((*a).to_string(), (*b).to_string(), (*c).to_string())).collect();
    Arc::new(Fusion::new(
        Arc::new(FixedRetriever { channel: SourceChannel::Semantic, entries }),
        Arc::new(FixedRetriever { channel: SourceChannel::Lexical, entries: vec![] }),
    ))
}

pub fn evidence() -> Arc<Fusion> {
    fusion_with(&[
        ("publish-artwork", "Publish Artwork to Platform", "Push approved artwork to a platform."),
        ("change-existing", "Change Existing Image Assets", "Replace or fix delivered images."),
    ])
}

pub fn no_evidence() -> Arc<Fusion> {
    fusion_with(&[])
}

pub fn assistant(fusion: Arc<Fusion>, generator: &Arc<ScriptedGenerator>) -> Arc<Assistant> {
    let generator: Arc<dyn Generator> = generator.clone();
    Arc::new(Assistant::new(fusion, generator, 60))
}

/// Every write fails.
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn create(&self, _fields: &Fields) -> anyhow::Result<RecordId> {
        Err(anyhow::anyhow!("store offline"))
    }

    async fn update(&self, _id: &str, _fields: &Fields) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("store offline"))
    }

    async fn read(&self, _id: &str) -> anyhow::Result<Fields> {
        Err(anyhow::anyhow!("store offline"))
    }
}
