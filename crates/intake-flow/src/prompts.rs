//! Prompt and reply text. Kept in one place so wording changes do not touch
//! control flow.

use intake_core::types::RequestCategory;

pub const CLASSIFIER_SYSTEM_INTRO: &str = "You are a strict JSON-only classifier for ticket requests.";
pub const CHAT_SYSTEM_INTRO: &str = "You are a strict JSON-only classifier for user chat responses.";
pub const SUMMARIZER_SYSTEM: &str = "You are an expert text summarizer assistant. Use ONLY the RAG context.";
pub const ANSWER_SYSTEM: &str = "You are a SkyShowtime imagery production assistant.\n\
Answer the user's question concisely using the provided RAG context below.\n\
If the RAG context doesn't contain the information, say:\n\
\"Sorry, I couldn't find details about that information.\"";

pub const NO_CONTEXT_REPLY: &str = "I wasn\u{2019}t able to find any relevant context to classify this request. \
Could you please describe your ticket again or add a bit more detail?";
pub const NOT_CONFIDENT_REPLY: &str = "I couldn\u{2019}t confidently determine the request type based on your description. \
Could you please describe your ticket again or add a bit more detail?";
pub const MATCH_REPLY: &str = "\u{2705} It looks like your request went through correctly!";
pub const UNRELATED_REPLY: &str = "I'm sorry, but I can only assist with SkyShowtime imagery production requests.";
pub const QUESTION_FALLBACK_REPLY: &str = "Sorry, I couldn't find details about that information.";
pub const NO_SUGGESTION_REPLY: &str = "\u{26a0}\u{fe0f} No LLM result found. Please try again.";
pub const ALREADY_COMPLETE_REPLY: &str = "This ticket is already complete. No further changes are needed.";

pub fn classifier_system() -> String {
    format!(
        "{CLASSIFIER_SYSTEM_INTRO}\n\
Use ONLY the provided RAG context to determine which category best fits the request description.\n\n\
Categories (must pick EXACTLY one):\n{}\n\n\
Respond ONLY in valid JSON, like:\n\
{{\n  \"result\": \"Make New Package\",\n  \"result_confidence\": 87,\n  \
\"result_explanation\": \"Reasoning based on context\",\n  \
\"result_summary\": \"Concise 1\u{2013}2 sentence definition of the meaning of the result category\"\n}}",
        RequestCategory::prompt_list()
    )
}

pub fn classifier_user(request_text: &str, evidence: &str) -> String {
    format!("Request Description: {request_text}\nRAG CONTEXT: {evidence}")
}

pub fn chat_system(intents: &str) -> String {
    format!(
        "{CHAT_SYSTEM_INTRO}\n\
You must choose ONE AND ONLY ONE of these valid categories for \"user_response_type\":\n{intents}\n\n\
Definitions:\n\
- yes: the user explicitly agrees or approves the suggested change in request type (e.g., \"yes\", \"ok\", \"sure\", \"please change it\", \"sounds good\", \"go ahead\").\n\
- no: the user explicitly disagrees or rejects the suggested change (e.g., \"no\", \"keep as is\", \"don't change it\", \"leave it\").\n\
- unrelated: the message is unrelated to SkyShowtime imagery or the ticket system (e.g., talking about weather, movies, or jokes).\n\
- question: the user is asking a question about SST imagery or the process.\n\
- more context: the user is adding or clarifying information about the ticket content (for example: adding details about episodes, localizations, or imagery).\n\n\
Classification priority:\n\
1. If the message contains \"yes\" or \"no\" but those words are part of a longer sentence that adds information about the ticket content (episodes, assets, imagery, etc.), classify as more context, not yes or no.\n\
2. If the overall intent of the message is agreeing or rejecting a change, classify as yes or no, even if the user adds small clarifying words like \"please\" or \"for me\".\n\
3. If yes/no appears only as part of a descriptive or clarifying message about the ticket content, classify as more context.\n\
4. If the message both gives context and expresses a decision, classify on the main intent: approve/deny is yes/no, explain/describe is more context.\n\n\
Examples:\n\
- \"Yes, please change it for me.\" -> yes\n\
- \"No, keep the same type.\" -> no\n\
- \"No, I meant episodes 3\u{2013}7 are missing.\" -> more context\n\
- \"Please add episodes 3\u{2013}7 to the package.\" -> more context\n\
- \"Can you explain what request type means?\" -> question\n\
- \"What's for lunch?\" -> unrelated\n\n\
Respond ONLY in valid JSON format like:\n{{\n  \"user_response_type\": \"yes\"\n}}"
    )
}

pub fn chat_user(message: &str) -> String {
    format!("User Message: {message}")
}

pub fn summarizer_user(label: &str, evidence: &str) -> String {
    format!("Define '{label}' in 1\u{2013}2 concise sentences based ONLY on this context:\n{evidence}")
}

pub fn summary_fallback(label: &str) -> String {
    format!("No reference definition is available for '{label}' right now.")
}

pub fn answer_user(question: &str, evidence: &str) -> String {
    format!("User Question: {question}\n\nRAG Context:\n{evidence}")
}

pub fn answer_error_reply(error: &impl std::fmt::Display) -> String {
    format!("Sorry, I couldn't retrieve information right now. ({error})")
}

pub fn more_context_reply(result: &str, summary: &str) -> String {
    format!(
        "Based on the new context you provided, I think '{result}' is the request type you're looking for.\n\n\
'{result}' means: {summary}\n\n\
Would you like me to change the Request Type to '{result}'?"
    )
}

pub fn unsure_reply(description: &str, result: &str, summary: &str) -> String {
    format!(
        "It looks like you weren't sure which request type your request falls under. No worries, I will help you out.\n\n\
Based on your Request Description '{description}', I think '{result}' is the request type you're looking for.\n\n\
'{result}' means: {summary}\n\n\
Would you like me to update the Request Type to '{result}' or choose another choice?"
    )
}

pub fn mismatch_reply(chosen: &str, chosen_summary: &str, description: &str, result: &str, summary: &str) -> String {
    format!(
        "It looks like you chose '{chosen}' for this ticket. However, based on your Request Description '{description}', \
I think '{result}' is the request type you're actually looking for.\n\n\
'{chosen}' means: {chosen_summary}\n\n\
'{result}' means: {summary}\n\n\
Would you like me to change the Request Type to '{result}' or continue with your previous choice?"
    )
}

pub fn switched_reply(category: &str) -> String {
    format!("\u{2705} Done \u{2014} I\u{2019}ve updated the Request Type to **{category}** in your ticket.")
}

pub fn kept_reply(chosen: &str) -> String {
    format!("Got it \u{2014} keeping Request Type as **{chosen}**. Finishing up now.")
}
