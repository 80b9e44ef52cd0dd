//! intake-flow
//!
//! Classification, orchestration and chat handling for ticket intake, plus
//! the generation and record-store adapters they run against.

use std::sync::Arc;

use intake_core::traits::Generator;
use intake_hybrid::Fusion;

pub mod chat;
pub mod classifier;
pub mod generator;
pub mod orchestrator;
pub mod prompts;
pub mod session;
pub mod store;

pub use chat::{ChatClassifier, ChatIntent, TurnReply};
pub use classifier::{ClassificationResult, Classifier, FirstPass};
pub use generator::{build_generator, OpenAiGenerator};
pub use orchestrator::{select_flow, Action, Decision, FlowType, Orchestrator, Summarizer};
pub use session::{ChatMessage, ConversationState, Role, TicketDraft, TicketSession, TurnOutcome};
pub use store::{build_store, AirtableStore, MemoryStore};

/// The three stateless collaborators a session drives, sharing one fusion
/// and one generator.
pub struct Assistant {
    pub classifier: Classifier,
    pub orchestrator: Orchestrator,
    pub chat: ChatClassifier,
}

impl Assistant {
    pub fn new(fusion: Arc<Fusion>, generator: Arc<dyn Generator>, confidence_floor: u8) -> Self {
        Self {
            classifier: Classifier::new(fusion.clone(), generator.clone()),
            orchestrator: Orchestrator::new(Summarizer::new(fusion.clone(), generator.clone()), confidence_floor),
            chat: ChatClassifier::new(fusion, generator),
        }
    }
}
