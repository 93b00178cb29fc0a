//! Chat data models shared by the pipeline and the HTTP/CLI frontends.
//!
//! All of these are created fresh per chat turn and dropped once the answer
//! is produced. The wire shape matches the JSON the web client sends:
//!
//! ```json
//! { "query": "And what about parking there?",
//!   "history": [ { "role": "User", "content": "Tell me about Jewel" },
//!                { "role": "Assistant", "content": "Jewel is ..." } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(alias = "user")]
    User,
    /// The web client labels bot turns `"AI"`.
    #[serde(alias = "assistant", alias = "AI")]
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("User"),
            Role::Assistant => f.write_str("Assistant"),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation, oldest message first. Owned by the caller.
pub type ChatHistory = Vec<ChatMessage>;

/// Input of one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    /// Latest user utterance, not yet part of `history`.
    pub query: String,
    #[serde(default)]
    pub history: ChatHistory,
    /// When true the result carries `history` with this turn appended.
    #[serde(default)]
    pub return_history: bool,
}

impl ChatTurnRequest {
    pub fn new(query: impl Into<String>, history: ChatHistory) -> Self {
        Self {
            query: query.into(),
            history,
            return_history: false,
        }
    }

    pub fn with_history_returned(mut self) -> Self {
        self.return_history = true;
        self
    }
}

/// Output of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurnResult {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_history: Option<ChatHistory>,
}

/// Appends a completed turn to a copy of `history`: the user query, then the
/// assistant answer.
pub fn append_turn(history: &[ChatMessage], query: &str, answer: &str) -> ChatHistory {
    let mut updated = Vec::with_capacity(history.len() + 2);
    updated.extend_from_slice(history);
    updated.push(ChatMessage::user(query));
    updated.push(ChatMessage::assistant(answer));
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_client_aliases() {
        let msgs: Vec<ChatMessage> = serde_json::from_str(
            r#"[{"role":"User","content":"a"},{"role":"AI","content":"b"},
                {"role":"assistant","content":"c"},{"role":"user","content":"d"}]"#,
        )
        .unwrap();
        let roles: Vec<Role> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Assistant, Role::User]
        );
    }

    #[test]
    fn test_role_serializes_canonical_name() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"Assistant","content":"hi"}"#);
    }

    #[test]
    fn test_request_defaults() {
        let req: ChatTurnRequest = serde_json::from_str(r#"{"query":"hello"}"#).unwrap();
        assert!(req.history.is_empty());
        assert!(!req.return_history);
    }

    #[test]
    fn test_result_omits_history_when_absent() {
        let result = ChatTurnResult {
            answer: "ok".to_string(),
            updated_history: None,
        };
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"answer":"ok"}"#);
    }

    #[test]
    fn test_append_turn_keeps_prior_order() {
        let history = vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")];
        let updated = append_turn(&history, "q2", "a2");
        assert_eq!(updated.len(), 4);
        assert_eq!(&updated[..2], &history[..]);
        assert_eq!(updated[2], ChatMessage::user("q2"));
        assert_eq!(updated[3], ChatMessage::assistant("a2"));
    }
}
