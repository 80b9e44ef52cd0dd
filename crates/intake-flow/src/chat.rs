//! Intent classification for replies during clarification.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use intake_core::structured::{parse_validated, Structured};
use intake_core::traits::Generator;
use intake_hybrid::Fusion;

use crate::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChatIntent {
    /// Accept the suggested label.
    #[serde(rename = "yes")]
    Agree,
    /// Keep the chosen label.
    #[serde(rename = "no")]
    Disagree,
    #[serde(rename = "unrelated")]
    Unrelated,
    #[serde(rename = "question")]
    Question,
    /// New detail about the ticket itself.
    #[serde(rename = "more context")]
    MoreContext,
}

impl ChatIntent {
    pub const ALL: [ChatIntent; 5] = [Self::Agree, Self::Disagree, Self::Unrelated, Self::Question, Self::MoreContext];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agree => "yes",
            Self::Disagree => "no",
            Self::Unrelated => "unrelated",
            Self::Question => "question",
            Self::MoreContext => "more context",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|i| i.as_str() == s)
    }

    pub fn prompt_list() -> String {
        let quoted: Vec<String> = Self::ALL.iter().map(|i| format!("\"{}\"", i.as_str())).collect();
        format!("[{}]", quoted.join(", "))
    }
}

impl fmt::Display for ChatIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified turn. `response` is filled for `question` and `unrelated`; the
/// other intents are rendered by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub intent: ChatIntent,
    pub response: String,
}

pub struct ChatClassifier {
    fusion: Arc<Fusion>,
    generator: Arc<dyn Generator>,
}

impl ChatClassifier {
    pub fn new(fusion: Arc<Fusion>, generator: Arc<dyn Generator>) -> Self {
        Self { fusion, generator }
    }

    pub async fn classify_turn(&self, message: &str) -> TurnReply {
        let intent = self.classify_intent(message).await;
        let response = match intent {
            ChatIntent::Question => self.answer(message).await,
            ChatIntent::Unrelated => prompts::UNRELATED_REPLY.to_string(),
            ChatIntent::Agree | ChatIntent::Disagree | ChatIntent::MoreContext => String::new(),
        };
        info!(intent = %intent, "chat turn classified");
        TurnReply { intent, response }
    }

    /// Anything unusable folds to `Unrelated`.
    async fn classify_intent(&self, message: &str) -> ChatIntent {
        let system = prompts::chat_system(&ChatIntent::prompt_list());
        let raw = match self.generator.generate(&system, &prompts::chat_user(message), true).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "chat classification failed");
                return ChatIntent::Unrelated;
            }
        };
        match parse_validated(&raw, "user_response_type", ChatIntent::parse) {
            Structured::Valid { value, .. } => value,
            Structured::Invalid { found, .. } => {
                debug!(found = %found, "chat intent outside the allowed set");
                ChatIntent::Unrelated
            }
            Structured::Unparseable(failure) => {
                debug!(?failure, "chat intent output is not a JSON object");
                ChatIntent::Unrelated
            }
        }
    }

    /// Answer strictly from retrieved evidence.
    async fn answer(&self, question: &str) -> String {
        let evidence = self.fusion.fuse(question).await;
        if evidence.is_empty() {
            return prompts::QUESTION_FALLBACK_REPLY.to_string();
        }
        match self
            .generator
            .generate(prompts::ANSWER_SYSTEM, &prompts::answer_user(question, &evidence.combined_text), false)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => prompts::QUESTION_FALLBACK_REPLY.to_string(),
            Err(e) => {
                warn!(error = %e, "question answering failed");
                prompts::answer_error_reply(&e)
            }
        }
    }
}
