mod common;

use std::sync::Arc;

use common::{assistant, evidence, FailingStore, Kind, ScriptedGenerator};
use intake_core::error::Error;
use intake_core::traits::RecordStore;
use intake_core::types::{ChosenLabel, RequestCategory, UNSURE_LABEL};
use intake_flow::{prompts, Action, FlowType, MemoryStore, Role, TicketDraft, TicketSession};

fn draft(request_type: &str, description: &str) -> TicketDraft {
    TicketDraft::new(request_type, description).with_field("Content Title", "Night Shift").with_field("Season #", "2")
}

#[tokio::test]
async fn matching_ticket_completes_and_finalizes_once() {
    let gen = ScriptedGenerator::new();
    gen.classify("Publish Artwork to Platform", 88, "Deliver art.");
    let store = Arc::new(MemoryStore::new());

    let (mut session, outcome) =
        TicketSession::open(assistant(evidence(), &gen), store.clone(), draft("Publish Artwork to Platform", "push artwork to platform X"))
            .await
            .unwrap();
    assert_eq!(outcome.action, Action::Complete);
    assert_eq!(outcome.message, prompts::MATCH_REPLY);
    assert!(outcome.warnings.is_empty());
    assert!(session.is_complete());

    let id = session.record_id().unwrap().to_string();
    let fields = store.read(&id).await.unwrap();
    assert_eq!(fields["Content Title"], "Night Shift");

    assert!(session.finalize().await.is_empty());
    let fields = store.read(&id).await.unwrap();
    assert_eq!(fields["Request Description"], "push artwork to platform X");
    let history = fields["Chatbot Chat History"].as_str().unwrap();
    assert!(history.starts_with("Assistant: \u{2705} It looks like your request went through correctly!\n"));
    assert!(history.contains("orchestrator: flow_type=`CORRECT_MATCH_COMPLETE`, action=`COMPLETE`"));
    assert!(history.contains("classifier: result=`Publish Artwork to Platform`, confidence=`88%`"));

    // second finalize is a no-op
    store.update(&id, &serde_json::from_str(r#"{"Request Description": "edited"}"#).unwrap()).await.unwrap();
    assert!(session.finalize().await.is_empty());
    assert_eq!(store.read(&id).await.unwrap()["Request Description"], "edited");
}

#[tokio::test]
async fn mismatch_then_agree_switches_request_type() {
    let gen = ScriptedGenerator::new();
    gen.classify("Change Existing Image Assets", 75, "Fix delivered images.")
        .push(Kind::Summary, "A new package.")
        .intent("yes");
    let store = Arc::new(MemoryStore::new());

    let (mut session, opened) =
        TicketSession::open(assistant(evidence(), &gen), store.clone(), draft("Make New Package", "the key art has a typo")).await.unwrap();
    assert_eq!(opened.action, Action::ChatLlm);
    assert_eq!(session.state().decision.as_ref().unwrap().flow, FlowType::MismatchLlm);

    let outcome = session.respond("Yes, please change it for me.").await.unwrap();
    assert_eq!(outcome.action, Action::Complete);
    assert_eq!(outcome.message, "\u{2705} Done \u{2014} I\u{2019}ve updated the Request Type to **Change Existing Image Assets** in your ticket.");
    assert_eq!(session.state().chosen, ChosenLabel::Category(RequestCategory::ChangeExistingImageAssets));

    let fields = store.read(session.record_id().unwrap()).await.unwrap();
    assert_eq!(fields["Request Type"], "Change Existing Image Assets");

    let last = session.history().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.debug.starts_with("chat parser: user_response_type=`yes`"));
}

#[tokio::test]
async fn mismatch_then_disagree_keeps_choice() {
    let gen = ScriptedGenerator::new();
    gen.classify("Change Existing Image Assets", 75, "Fix.").push(Kind::Summary, "New.").intent("no");
    let store = Arc::new(MemoryStore::new());

    let (mut session, _) =
        TicketSession::open(assistant(evidence(), &gen), store.clone(), draft("Make New Package", "typo")).await.unwrap();
    let outcome = session.respond("No, keep the same type.").await.unwrap();
    assert_eq!(outcome.action, Action::Complete);
    assert_eq!(outcome.message, "Got it \u{2014} keeping Request Type as **Make New Package**. Finishing up now.");
    let fields = store.read(session.record_id().unwrap()).await.unwrap();
    assert_eq!(fields["Request Type"], "Make New Package");
}

#[tokio::test]
async fn repeated_more_context_never_returns_to_first_pass() {
    let gen = ScriptedGenerator::new();
    gen.classify("Add Missing Image Assets", 80, "Missing art.")
        .intent("more context")
        .classify("Make New Package", 82, "New package.")
        .intent("more context")
        .classify("Add Missing Image Assets", 90, "Missing art.");
    let store = Arc::new(MemoryStore::new());

    let (mut session, opened) =
        TicketSession::open(assistant(evidence(), &gen), store, draft(UNSURE_LABEL, "some episodes lack posters")).await.unwrap();
    assert!(opened.message.starts_with("It looks like you weren't sure"));
    assert!(session.state().classification.as_ref().unwrap().is_first_pass);

    for text in ["No, I meant episodes 3\u{2013}7 are missing.", "Also the season 2 key art."] {
        let outcome = session.respond(text).await.unwrap();
        assert_eq!(outcome.action, Action::ChatLlm);
        assert!(outcome.message.starts_with("Based on the new context you provided"));
        assert!(!outcome.message.contains("weren't sure"));
        let state = session.state();
        assert!(!state.classification.as_ref().unwrap().is_first_pass);
        assert_eq!(state.decision.as_ref().unwrap().flow, FlowType::MoreContextLlm);
        assert_eq!(state.request_text, text);
    }
    assert!(gen.calls_of(Kind::Summary).is_empty());
}

#[tokio::test]
async fn retry_reclassifies_new_description() {
    let gen = ScriptedGenerator::new();
    gen.classify("Publish Artwork to Platform", 40, "s").classify("Publish Artwork to Platform", 92, "s");
    let store = Arc::new(MemoryStore::new());

    let (mut session, opened) =
        TicketSession::open(assistant(evidence(), &gen), store.clone(), draft("Publish Artwork to Platform", "stuff")).await.unwrap();
    assert_eq!(opened.action, Action::Retry);
    assert_eq!(opened.message, prompts::NOT_CONFIDENT_REPLY);

    let outcome = session.respond("push the approved artwork to the platform").await.unwrap();
    assert_eq!(outcome.action, Action::Complete);
    assert!(gen.calls_of(Kind::Chat).is_empty(), "retry turns skip the chat classifier");

    session.finalize().await;
    let fields = store.read(session.record_id().unwrap()).await.unwrap();
    assert_eq!(fields["Request Description"], "stuff\n\npush the approved artwork to the platform");
    let transcript = session.transcript();
    assert!(transcript.contains("\n\nUser: push the approved artwork to the platform\n\nAssistant: "));
}

#[tokio::test]
async fn question_and_unrelated_leave_state_unchanged() {
    let gen = ScriptedGenerator::new();
    gen.classify("Add Missing Image Assets", 80, "Missing art.")
        .intent("unrelated")
        .intent("question")
        .push(Kind::Answer, "Only approved artwork is published.");
    let store = Arc::new(MemoryStore::new());

    let (mut session, _) = TicketSession::open(assistant(evidence(), &gen), store, draft(UNSURE_LABEL, "posters")).await.unwrap();
    let unrelated = session.respond("What's for lunch?").await.unwrap();
    assert_eq!(unrelated.action, Action::ChatLlm);
    assert_eq!(unrelated.message, prompts::UNRELATED_REPLY);

    let question = session.respond("What gets published?").await.unwrap();
    assert_eq!(question.action, Action::ChatLlm);
    assert_eq!(question.message, "Only approved artwork is published.");
    assert_eq!(gen.calls_of(Kind::Classify).len(), 1);
}

#[tokio::test]
async fn store_failures_become_warnings() {
    let gen = ScriptedGenerator::new();
    gen.classify("Add Missing Image Assets", 80, "Missing art.").intent("yes");

    let (mut session, opened) =
        TicketSession::open(assistant(evidence(), &gen), Arc::new(FailingStore), draft(UNSURE_LABEL, "posters")).await.unwrap();
    assert_eq!(opened.action, Action::ChatLlm);
    assert_eq!(opened.warnings.len(), 1);
    assert!(opened.warnings[0].contains("store offline"));
    assert!(session.record_id().is_none());

    let agreed = session.respond("yes").await.unwrap();
    assert_eq!(agreed.action, Action::Complete);
    assert_eq!(agreed.warnings.len(), 1);

    assert_eq!(session.finalize().await.len(), 2);
}

#[tokio::test]
async fn completed_session_ignores_further_turns() {
    let gen = ScriptedGenerator::new();
    gen.classify("Make New Package", 99, "s");
    let (mut session, _) =
        TicketSession::open(assistant(evidence(), &gen), Arc::new(MemoryStore::new()), draft("Make New Package", "new package")).await.unwrap();
    let before = session.history().len();
    let outcome = session.respond("anything else").await.unwrap();
    assert_eq!(outcome.message, prompts::ALREADY_COMPLETE_REPLY);
    assert_eq!(session.history().len(), before);
    assert!(matches!(session.respond("   ").await, Err(Error::InvalidTicket(_))));
}

#[tokio::test]
async fn invalid_drafts_are_rejected_before_any_call() {
    let gen = ScriptedGenerator::new();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    for d in [draft("", "desc"), draft("Make New Package", "  "), draft("Order Pizza", "desc")] {
        let err = TicketSession::open(assistant(evidence(), &gen), store.clone(), d).await.err().unwrap();
        assert!(matches!(err, Error::InvalidTicket(_)));
    }
    assert!(gen.calls().is_empty());
}
