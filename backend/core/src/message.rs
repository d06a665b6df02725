use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Role, Turn};

/// A message received from the messaging transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Conversation identifier; replies go back here and sessions are keyed by it.
    pub chat_id: String,
    /// Display name or handle of the sender, for logging only.
    pub sender: Option<String>,
    /// `None` for non-text messages (stickers, photos, ...).
    pub text: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender: None,
            text: Some(text.into()),
            received_at: Utc::now(),
        }
    }
}

/// Everything a completion strategy needs to produce one reply.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub session_id: String,
    /// System instructions; may be empty.
    pub instructions: String,
    /// Prior turns, already cut to the context window, oldest first.
    pub history: Vec<Turn>,
    /// The incoming user text.
    pub user_text: String,
    /// Existing server-side thread, if the session already has one.
    pub thread_id: Option<String>,
}

impl CompletionRequest {
    /// `(role, text)` pairs in send order: instructions first (omitted when
    /// empty), then history, then the incoming user text.
    pub fn ordered_messages(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::with_capacity(self.history.len() + 2);
        if !self.instructions.is_empty() {
            out.push(("system", self.instructions.as_str()));
        }
        out.extend(self.history.iter().map(|t| (t.role.as_str(), t.text.as_str())));
        out.push((Role::User.as_str(), self.user_text.as_str()));
        out
    }
}

/// The reply produced for a [`CompletionRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Thread the reply was produced on (run-based services only).
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            thread_id: None,
            run_id: None,
        }
    }
}
