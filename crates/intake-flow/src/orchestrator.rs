//! Conversation state machine: what happens after a classification.
//!
//! Rules are evaluated in strict priority order. Missing evidence and
//! unusable model output are checked before confidence, and confidence before
//! the label comparison, so a weak match is retried rather than accepted.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use intake_core::traits::Generator;
use intake_core::types::{ChosenLabel, Label};
use intake_hybrid::Fusion;

use crate::classifier::ClassificationResult;
use crate::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Terminal: the chosen label stands or was confirmed.
    Complete,
    /// Ask the user to describe the request again.
    Retry,
    /// Ask the user to confirm or reject a suggested label.
    #[serde(rename = "CHATLLM")]
    ChatLlm,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "COMPLETE",
            Self::Retry => "RETRY",
            Self::ChatLlm => "CHATLLM",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowType {
    RagRetrievalError,
    LlmJsonError,
    LlmCategorizationError,
    LowConfidenceError,
    CorrectMatchComplete,
    MoreContextLlm,
    UserUnsureLlm,
    MismatchLlm,
}

impl FlowType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RagRetrievalError => "RAG_RETRIEVAL_ERROR",
            Self::LlmJsonError => "LLM_JSON_ERROR",
            Self::LlmCategorizationError => "LLM_CATEGORIZATION_ERROR",
            Self::LowConfidenceError => "LOW_CONFIDENCE_ERROR",
            Self::CorrectMatchComplete => "CORRECT_MATCH_COMPLETE",
            Self::MoreContextLlm => "MORE_CONTEXT_LLM",
            Self::UserUnsureLlm => "USER_UNSURE_LLM",
            Self::MismatchLlm => "MISMATCH_LLM",
        }
    }

    pub fn action(self) -> Action {
        match self {
            Self::RagRetrievalError | Self::LlmJsonError | Self::LlmCategorizationError | Self::LowConfidenceError => Action::Retry,
            Self::CorrectMatchComplete => Action::Complete,
            Self::MoreContextLlm | Self::UserUnsureLlm | Self::MismatchLlm => Action::ChatLlm,
        }
    }

    fn debug_note(self, floor: u8) -> String {
        match self {
            Self::RagRetrievalError => "RAG retrieved 0 chunks".to_string(),
            Self::LlmJsonError => "The LLM responded in a format outside of JSON requirements.".to_string(),
            Self::LlmCategorizationError => "The LLM gave an undefined category.".to_string(),
            Self::LowConfidenceError => format!("confidence level of result is <= {floor}"),
            Self::CorrectMatchComplete => "result matches request type".to_string(),
            Self::MoreContextLlm => "suggestion after additional context".to_string(),
            Self::UserUnsureLlm => "user was unsure; suggesting a request type".to_string(),
            Self::MismatchLlm => "result differs from the chosen request type".to_string(),
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure rule selection.
pub fn select_flow(result: &ClassificationResult, chosen: ChosenLabel, confidence_floor: u8) -> FlowType {
    if result.total_chunk_count == 0 {
        FlowType::RagRetrievalError
    } else if result.label == Label::JsonError {
        FlowType::LlmJsonError
    } else if result.label == Label::CategorizationError {
        FlowType::LlmCategorizationError
    } else if result.confidence <= confidence_floor {
        FlowType::LowConfidenceError
    } else if result.label.matches(chosen) {
        FlowType::CorrectMatchComplete
    } else if !result.is_first_pass {
        FlowType::MoreContextLlm
    } else if chosen == ChosenLabel::Unsure {
        FlowType::UserUnsureLlm
    } else {
        FlowType::MismatchLlm
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub flow: FlowType,
    pub action: Action,
    pub message: String,
    pub debug: String,
}

/// Defines a request type in one or two sentences from retrieved evidence.
pub struct Summarizer {
    fusion: Arc<Fusion>,
    generator: Arc<dyn Generator>,
}

impl Summarizer {
    pub fn new(fusion: Arc<Fusion>, generator: Arc<dyn Generator>) -> Self {
        Self { fusion, generator }
    }

    /// Free-text generation; failures fall back to a fixed sentence.
    pub async fn summarize(&self, label: &str) -> String {
        let evidence = self.fusion.fuse(label).await;
        match self
            .generator
            .generate(prompts::SUMMARIZER_SYSTEM, &prompts::summarizer_user(label, &evidence.combined_text), false)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!(label, "summarizer returned nothing");
                prompts::summary_fallback(label)
            }
            Err(e) => {
                warn!(label, error = %e, "summarizer failed");
                prompts::summary_fallback(label)
            }
        }
    }
}

pub struct Orchestrator {
    summarizer: Summarizer,
    confidence_floor: u8,
}

impl Orchestrator {
    pub fn new(summarizer: Summarizer, confidence_floor: u8) -> Self {
        Self { summarizer, confidence_floor }
    }

    /// Pick the next state and render its message. Only the first-pass
    /// mismatch path makes an extra generation call.
    pub async fn decide(&self, result: &ClassificationResult, chosen: ChosenLabel, request_text: &str) -> Decision {
        let flow = select_flow(result, chosen, self.confidence_floor);
        let suggested = result.label.as_str();
        let message = match flow {
            FlowType::RagRetrievalError => prompts::NO_CONTEXT_REPLY.to_string(),
            FlowType::LlmJsonError | FlowType::LlmCategorizationError | FlowType::LowConfidenceError => {
                prompts::NOT_CONFIDENT_REPLY.to_string()
            }
            FlowType::CorrectMatchComplete => prompts::MATCH_REPLY.to_string(),
            FlowType::MoreContextLlm => prompts::more_context_reply(suggested, &result.summary),
            FlowType::UserUnsureLlm => prompts::unsure_reply(request_text, suggested, &result.summary),
            FlowType::MismatchLlm => {
                let chosen_summary = self.summarizer.summarize(chosen.label()).await;
                prompts::mismatch_reply(chosen.label(), &chosen_summary, request_text, suggested, &result.summary)
            }
        };
        let decision = Decision { flow, action: flow.action(), message, debug: flow.debug_note(self.confidence_floor) };
        info!(flow = %decision.flow, action = %decision.action, "orchestrator decision");
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::types::RequestCategory;

    fn result(label: Label, confidence: u8, chunks: usize, first: bool) -> ClassificationResult {
        ClassificationResult {
            label,
            confidence,
            explanation: String::new(),
            summary: "s".into(),
            evidence_title: String::new(),
            total_chunk_count: chunks,
            is_first_pass: first,
        }
    }

    const PUBLISH: Label = Label::Category(RequestCategory::PublishArtworkToPlatform);
    const CHOSEN_PUBLISH: ChosenLabel = ChosenLabel::Category(RequestCategory::PublishArtworkToPlatform);

    #[test]
    fn evidence_absence_outranks_everything() {
        assert_eq!(select_flow(&result(PUBLISH, 95, 0, true), CHOSEN_PUBLISH, 60), FlowType::RagRetrievalError);
        assert_eq!(select_flow(&result(Label::JsonError, 0, 0, true), CHOSEN_PUBLISH, 60), FlowType::RagRetrievalError);
    }

    #[test]
    fn sentinels_are_checked_before_confidence() {
        assert_eq!(select_flow(&result(Label::JsonError, 99, 2, true), CHOSEN_PUBLISH, 60), FlowType::LlmJsonError);
        assert_eq!(
            select_flow(&result(Label::CategorizationError, 99, 2, true), CHOSEN_PUBLISH, 60),
            FlowType::LlmCategorizationError
        );
    }

    #[test]
    fn floor_is_inclusive() {
        assert_eq!(select_flow(&result(PUBLISH, 60, 2, true), CHOSEN_PUBLISH, 60), FlowType::LowConfidenceError);
        assert_eq!(select_flow(&result(PUBLISH, 61, 2, true), CHOSEN_PUBLISH, 60), FlowType::CorrectMatchComplete);
        assert_eq!(FlowType::LowConfidenceError.action(), Action::Retry);
    }

    #[test]
    fn later_passes_skip_first_time_framing() {
        let chosen = ChosenLabel::Unsure;
        assert_eq!(select_flow(&result(PUBLISH, 80, 2, true), chosen, 60), FlowType::UserUnsureLlm);
        assert_eq!(select_flow(&result(PUBLISH, 80, 2, false), chosen, 60), FlowType::MoreContextLlm);
        let mismatch = ChosenLabel::Category(RequestCategory::MakeNewPackage);
        assert_eq!(select_flow(&result(PUBLISH, 80, 2, true), mismatch, 60), FlowType::MismatchLlm);
        assert_eq!(select_flow(&result(PUBLISH, 80, 2, false), mismatch, 60), FlowType::MoreContextLlm);
    }

    #[test]
    fn match_completes_even_after_first_pass() {
        assert_eq!(select_flow(&result(PUBLISH, 80, 1, false), CHOSEN_PUBLISH, 60), FlowType::CorrectMatchComplete);
    }

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_string(&Action::ChatLlm).unwrap(), "\"CHATLLM\"");
        assert_eq!(serde_json::to_string(&FlowType::UserUnsureLlm).unwrap(), "\"USER_UNSURE_LLM\"");
        assert_eq!(FlowType::MismatchLlm.to_string(), "MISMATCH_LLM");
    }
}
