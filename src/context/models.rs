//! Data models for context window preparation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message, serialized as `{ "role", "content" }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Outcome of preparing a conversation for a model's context window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPreparationResult {
    /// Messages to send, system prompt first
    pub messages: Vec<Message>,
    /// Estimated tokens of `messages`
    pub token_count: usize,
    /// Whether older messages were replaced by a summary
    pub was_truncated: bool,
    /// Summary text, present only when truncated
    pub summary: Option<String>,
    /// Conversation messages folded into the summary or dropped
    pub summarized_count: usize,
    /// Conversation messages sent verbatim
    pub kept_count: usize,
}

impl ContextPreparationResult {
    /// Build the `{ model, messages }` body for a chat-completion request
    pub fn to_request_body(&self, model: &str) -> serde_json::Value {
        serde_json::json!({
            "model": model,
            "messages": self.messages,
        })
    }
}
