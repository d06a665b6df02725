use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message exchanged in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Per-user conversational state, held in memory for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Retained suffix of the conversation, oldest first.
    pub turns: Vec<Turn>,
    /// Server-side thread for run-based completion services.
    pub thread_id: Option<String>,
    /// Successful exchanges since the session started. Failed calls do not count.
    pub message_count: u64,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            turns: Vec::new(),
            thread_id: None,
            message_count: 0,
            started_at: now,
            last_active_at: now,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.last_active_at = turn.created_at.max(self.last_active_at);
        self.turns.push(turn);
    }

    /// Drop everything but the most recent `max_turns` turns.
    pub fn trim(&mut self, max_turns: usize) {
        if self.turns.len() > max_turns {
            let excess = self.turns.len() - max_turns;
            self.turns.drain(..excess);
        }
    }

    /// The last `k` turns, oldest first.
    pub fn recent(&self, k: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(k);
        &self.turns[start..]
    }
}

/// Status of a server-side run in the asynchronous completion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Expired,
}

impl RunStatus {
    /// Map the remote status vocabulary onto the local set.
    ///
    /// Unknown strings map to `InProgress`, so only the attempt ceiling can end them.
    pub fn from_api(status: &str) -> Self {
        match status {
            "queued" => RunStatus::Pending,
            "in_progress" | "cancelling" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            "failed" | "cancelled" | "incomplete" | "requires_action" => RunStatus::Failed,
            "expired" => RunStatus::Expired,
            _ => RunStatus::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Expired
        )
    }
}

/// Which protocol shape the completion service speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMode {
    /// One request, reply in the same round-trip.
    #[default]
    Chat,
    /// Thread/run protocol with polling.
    Assistants,
    /// Local echo, no network.
    Echo,
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompletionMode::Chat => "chat",
            CompletionMode::Assistants => "assistants",
            CompletionMode::Echo => "echo",
        })
    }
}

impl FromStr for CompletionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "single" | "single-shot" => Ok(CompletionMode::Chat),
            "assistants" | "assistant" | "runs" => Ok(CompletionMode::Assistants),
            "echo" => Ok(CompletionMode::Echo),
            other => Err(format!("unknown completion mode '{other}'")),
        }
    }
}

/// Markup applied to outgoing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    Plain,
    /// Telegram's legacy Markdown.
    #[default]
    Markdown,
    MarkdownV2,
    Html,
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageFormat::Plain => "plain",
            MessageFormat::Markdown => "markdown",
            MessageFormat::MarkdownV2 => "markdownv2",
            MessageFormat::Html => "html",
        })
    }
}

impl FromStr for MessageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "none" | "text" => Ok(MessageFormat::Plain),
            "markdown" => Ok(MessageFormat::Markdown),
            "markdownv2" | "markdown_v2" => Ok(MessageFormat::MarkdownV2),
            "html" => Ok(MessageFormat::Html),
            other => Err(format!("unknown message format '{other}'")),
        }
    }
}
