//! Prompt templates for the rewrite and answer steps.
//!
//! History is rendered one message per line as `Role: content`, using only
//! the [`history_window`] suffix.

use crate::history::history_window;
use crate::models::ChatMessage;

/// Render the windowed history as `Role: content` lines.
pub fn format_history(history: &[ChatMessage]) -> String {
    history_window(history)
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking the model to turn `query` into a self-contained question.
pub fn rewrite_prompt(query: &str, history: &[ChatMessage]) -> String {
    format!(
        "Based on the following chat history and the user's latest question,\n\
         rewrite the question into a standalone query that can be understood\n\
         without the conversation context.\n\
         \n\
         Chat History:\n\
         {history}\n\
         \n\
         User's Latest Question:\n\
         {query}\n\
         \n\
         Standalone Query:\n",
        history = format_history(history),
        query = query,
    )
}

/// Prompt asking the model to answer `query` from `context` only.
///
/// `persona` names what the assistant helps with (e.g. `"Changi Airport"`).
pub fn answer_prompt(persona: &str, query: &str, context: &str, history: &[ChatMessage]) -> String {
    format!(
        "You are a helpful assistant for {persona}. Answer the user's latest question based ONLY on the\n\
         provided context. Use the chat history for conversational context. If the\n\
         retrieved context does not contain the answer, state that you don't have enough information.\n\
         \n\
         Chat History:\n\
         {history}\n\
         \n\
         Retrieved Context:\n\
         ---\n\
         {context}\n\
         ---\n\
         \n\
         User's Latest Question:\n\
         {query}\n\
         \n\
         ANSWER:\n",
        persona = persona,
        history = format_history(history),
        context = context,
        query = query,
    )
}
