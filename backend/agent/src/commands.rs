//! Control commands: `/start`, `/help`, `/reset`.
//!
//! Detection follows the usual chat-bot convention: the first whitespace-
//! separated token, with any `@botname` suffix dropped.

use std::sync::Arc;

use hermes_core::ReplySink;
use hermes_scheduler::FollowUpScheduler;
use tracing::{error, info};

use crate::session_store::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Reset,
    Unknown(String),
}

/// Parse `text` as a command. `None` means it is an ordinary message.
pub fn parse_command(text: &str, prefix: char) -> Option<Command> {
    let trimmed = text.trim();
    let name = trimmed.strip_prefix(prefix)?;
    let name = name.split_whitespace().next().unwrap_or_default();
    let name = name.split('@').next().unwrap_or_default();

    Some(match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "reset" | "new" => Command::Reset,
        other => Command::Unknown(other.to_string()),
    })
}

#[derive(Debug, Clone)]
pub struct CommandTexts {
    pub greeting: String,
    pub help: String,
    pub reset_done: String,
    pub unknown: String,
}

impl Default for CommandTexts {
    fn default() -> Self {
        Self {
            greeting: "👋 Hi! Send me a message and I'll reply.".into(),
            help: "Just write to me. Commands:\n/reset - start a new conversation\n/help - show this message".into(),
            reset_done: "🧹 Conversation cleared.".into(),
            unknown: "Unknown command. Try /help.".into(),
        }
    }
}

pub struct CommandRouter {
    store: Arc<SessionStore>,
    follow_ups: FollowUpScheduler,
    sink: Arc<dyn ReplySink>,
    texts: CommandTexts,
}

impl CommandRouter {
    pub fn new(
        store: Arc<SessionStore>,
        follow_ups: FollowUpScheduler,
        sink: Arc<dyn ReplySink>,
        texts: CommandTexts,
    ) -> Self {
        Self {
            store,
            follow_ups,
            sink,
            texts,
        }
    }

    pub async fn run(&self, chat_id: &str, command: Command) {
        info!(session_id = %chat_id, ?command, "Handling command");

        let reply = match &command {
            Command::Start => &self.texts.greeting,
            Command::Help => &self.texts.help,
            Command::Reset => {
                // Waits out any exchange in flight so it cannot write into the fresh session.
                let _permit = self.store.acquire(chat_id).await;
                let existed = self.store.reset(chat_id);
                let cancelled = self.follow_ups.cancel(chat_id).await;
                info!(session_id = %chat_id, existed, cancelled, "Session reset");
                &self.texts.reset_done
            }
            Command::Unknown(_) => &self.texts.unknown,
        };

        if let Err(e) = self.sink.send(chat_id, reply).await {
            error!(session_id = %chat_id, error = %e, "Failed to deliver command reply");
        }
    }
}
