//! Turn-based ticket conversation.
//!
//! A session owns its [`ConversationState`] and chat transcript. Each call to
//! [`TicketSession::respond`] processes exactly one user message. Persistence
//! failures never abort a turn; they come back as warnings on the outcome.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use intake_core::error::{Error, Result};
use intake_core::traits::{Fields, RecordId, RecordStore};
use intake_core::types::{ChosenLabel, RequestCategory};

use crate::chat::{ChatIntent, TurnReply};
use crate::classifier::{ClassificationResult, FirstPass};
use crate::orchestrator::{Action, Decision};
use crate::prompts;
use crate::store::{CHAT_HISTORY_FIELD, REQUEST_DESCRIPTION_FIELD, REQUEST_TYPE_FIELD};
use crate::Assistant;

/// Form input. Only `Request Type` and `Request Description` are read; every
/// other field is passed to the store untouched.
#[derive(Debug, Clone, Default)]
pub struct TicketDraft {
    pub fields: Fields,
}

impl TicketDraft {
    pub fn new(request_type: &str, request_description: &str) -> Self {
        Self::default()
            .with_field(REQUEST_TYPE_FIELD, request_type)
            .with_field(REQUEST_DESCRIPTION_FIELD, request_description)
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Mandatory fields present and the request type is a known choice.
    pub fn validate(&self) -> Result<(ChosenLabel, String)> {
        let request_type = self.text(REQUEST_TYPE_FIELD).ok_or_else(|| Error::InvalidTicket(format!("'{REQUEST_TYPE_FIELD}' is required")))?;
        let description = self
            .text(REQUEST_DESCRIPTION_FIELD)
            .ok_or_else(|| Error::InvalidTicket(format!("'{REQUEST_DESCRIPTION_FIELD}' is required")))?;
        let chosen = ChosenLabel::parse(request_type)
            .ok_or_else(|| Error::InvalidTicket(format!("unknown request type '{request_type}'")))?;
        Ok((chosen, description.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Trace of what produced an assistant message; empty for user messages.
    pub debug: String,
}

#[derive(Debug, Clone)]
pub struct ConversationState {
    pub chosen: ChosenLabel,
    pub original_description: String,
    /// Text the latest classification ran on.
    pub request_text: String,
    pub first_pass: FirstPass,
    pub classification: Option<ClassificationResult>,
    pub decision: Option<Decision>,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub message: String,
    pub action: Action,
    pub warnings: Vec<String>,
}

pub struct TicketSession {
    assistant: Arc<Assistant>,
    store: Arc<dyn RecordStore>,
    record_id: Option<RecordId>,
    state: ConversationState,
    history: Vec<ChatMessage>,
    finalized: bool,
}

impl TicketSession {
    /// Validate the draft, create its record and run the first classification.
    pub async fn open(assistant: Arc<Assistant>, store: Arc<dyn RecordStore>, draft: TicketDraft) -> Result<(Self, TurnOutcome)> {
        let (chosen, description) = draft.validate()?;
        let mut warnings = Vec::new();
        let record_id = match store.create(&draft.fields).await {
            Ok(id) => {
                info!(record_id = %id, "ticket record created");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "failed to create ticket record");
                warnings.push(format!("Failed to create the ticket record: {e}"));
                None
            }
        };
        let mut session = Self {
            assistant,
            store,
            record_id,
            state: ConversationState {
                chosen,
                original_description: description.clone(),
                request_text: description.clone(),
                first_pass: FirstPass::new(),
                classification: None,
                decision: None,
                action: Action::Retry,
            },
            history: Vec::new(),
            finalized: false,
        };
        let mut outcome = session.reclassify(description, None).await;
        warnings.append(&mut outcome.warnings);
        outcome.warnings = warnings;
        Ok((session, outcome))
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.state.action == Action::Complete
    }

    /// Process one user message.
    pub async fn respond(&mut self, message: &str) -> Result<TurnOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidTicket("empty chat message".into()));
        }
        let outcome = match self.state.action {
            Action::Complete => {
                TurnOutcome { message: prompts::ALREADY_COMPLETE_REPLY.to_string(), action: Action::Complete, warnings: vec![] }
            }
            Action::Retry => {
                self.push(Role::User, message.to_string(), String::new());
                self.reclassify(message.to_string(), None).await
            }
            Action::ChatLlm => {
                self.push(Role::User, message.to_string(), String::new());
                let reply = self.assistant.chat.classify_turn(message).await;
                self.handle_chat(message, reply).await
            }
        };
        Ok(outcome)
    }

    async fn handle_chat(&mut self, message: &str, reply: TurnReply) -> TurnOutcome {
        let intent = reply.intent;
        match intent {
            ChatIntent::Agree => {
                let Some(category) = self.state.classification.as_ref().and_then(|c| c.label.category()) else {
                    return self.say(prompts::NO_SUGGESTION_REPLY.to_string(), self.state.action, Some(intent), vec![]);
                };
                let mut warnings = Vec::new();
                self.write_request_type(category, &mut warnings).await;
                self.state.chosen = ChosenLabel::Category(category);
                self.state.action = Action::Complete;
                info!(request_type = %category, "request type switched");
                self.say(prompts::switched_reply(category.label()), Action::Complete, Some(intent), warnings)
            }
            ChatIntent::Disagree => {
                self.state.action = Action::Complete;
                info!(request_type = %self.state.chosen, "request type kept");
                self.say(prompts::kept_reply(self.state.chosen.label()), Action::Complete, Some(intent), vec![])
            }
            ChatIntent::Question | ChatIntent::Unrelated => self.say(reply.response, self.state.action, Some(intent), vec![]),
            ChatIntent::MoreContext => self.reclassify(message.to_string(), Some(intent)).await,
        }
    }

    /// Classify `request_text` and decide. The result becomes current state.
    async fn reclassify(&mut self, request_text: String, intent: Option<ChatIntent>) -> TurnOutcome {
        let result = self.assistant.classifier.classify(&request_text, &mut self.state.first_pass).await;
        let decision = self.assistant.orchestrator.decide(&result, self.state.chosen, &request_text).await;
        self.state.request_text = request_text;
        self.state.action = decision.action;
        self.state.classification = Some(result);
        let message = decision.message.clone();
        self.state.decision = Some(decision);
        self.say(message, self.state.action, intent, vec![])
    }

    fn say(&mut self, message: String, action: Action, intent: Option<ChatIntent>, warnings: Vec<String>) -> TurnOutcome {
        let debug = self.trace(intent);
        self.push(Role::Assistant, message.clone(), debug);
        TurnOutcome { message, action, warnings }
    }

    fn push(&mut self, role: Role, content: String, debug: String) {
        self.history.push(ChatMessage { role, content, debug });
    }

    fn trace(&self, intent: Option<ChatIntent>) -> String {
        let mut lines = Vec::new();
        if let Some(intent) = intent {
            lines.push(format!("chat parser: user_response_type=`{intent}`"));
        }
        if let Some(c) = &self.state.classification {
            lines.push(format!("classifier: result=`{}`, confidence=`{}%`, summary=`{}`", c.label, c.confidence, c.summary));
        }
        if let Some(d) = &self.state.decision {
            lines.push(format!("orchestrator: flow_type=`{}`, action=`{}`", d.flow, d.action));
        }
        lines.join("\n")
    }

    async fn write_request_type(&self, category: RequestCategory, warnings: &mut Vec<String>) {
        let mut fields = Fields::new();
        fields.insert(REQUEST_TYPE_FIELD.to_string(), Value::String(category.label().to_string()));
        self.write("Request Type", &fields, warnings).await;
    }

    async fn write(&self, what: &str, fields: &Fields, warnings: &mut Vec<String>) {
        let Some(id) = &self.record_id else {
            warnings.push(format!("Could not update {what}: no ticket record was created."));
            return;
        };
        if let Err(e) = self.store.update(id, fields).await {
            warn!(record_id = %id, what, error = %e, "record update failed");
            warnings.push(format!("Could not update {what}: {e}"));
        }
    }

    /// Original description first, then every user message in order.
    pub fn consolidated_description(&self) -> String {
        std::iter::once(self.state.original_description.as_str())
            .chain(self.history.iter().filter(|m| m.role == Role::User).map(|m| m.content.as_str()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn transcript(&self) -> String {
        self.history
            .iter()
            .map(|m| {
                if m.debug.is_empty() {
                    format!("{}: {}", m.role.as_str(), m.content)
                } else {
                    format!("{}: {}\n{}", m.role.as_str(), m.content, m.debug)
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Write the consolidated description and transcript. Runs once; later
    /// calls return no warnings and write nothing.
    pub async fn finalize(&mut self) -> Vec<String> {
        if self.finalized {
            return vec![];
        }
        self.finalized = true;
        let mut warnings = Vec::new();
        let mut description = Fields::new();
        description.insert(REQUEST_DESCRIPTION_FIELD.to_string(), Value::String(self.consolidated_description()));
        self.write("Request Description", &description, &mut warnings).await;
        let mut history = Fields::new();
        history.insert(CHAT_HISTORY_FIELD.to_string(), Value::String(self.transcript()));
        self.write("Chatbot Chat History", &history, &mut warnings).await;
        info!(record_id = ?self.record_id, warnings = warnings.len(), "session finalized");
        warnings
    }
}
