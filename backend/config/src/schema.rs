//! Hermes runtime configuration schema.
//!
//! Every section has defaults, so a YAML file only needs the keys it changes.
//! Secrets normally come from the environment rather than the file.

use hermes_core::{CompletionMode, MessageFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HermesConfig {
    pub telegram: TelegramConfig,
    pub completion: CompletionConfig,
    pub session: SessionConfig,
    pub prompt: PromptConfig,
    pub reply: ReplyConfig,
    pub follow_up: FollowUpConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    /// Bot token (`TELEGRAM_TOKEN`). Required.
    pub bot_token: Option<String>,
    /// Leading character that marks a control command.
    pub command_prefix: char,
    /// Markup Telegram applies to outgoing replies.
    pub parse_mode: MessageFormat,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            command_prefix: DEFAULT_COMMAND_PREFIX,
            parse_mode: MessageFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Completion service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionConfig {
    pub mode: CompletionMode,
    /// `OPENAI_API_KEY`. Required unless `mode` is `echo`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub request_timeout_secs: u64,
    /// Pre-provisioned assistant (`ASSISTANT_ID`). Required in `assistants` mode.
    pub assistant_id: Option<String>,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            mode: CompletionMode::Chat,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            assistant_id: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Turns kept per session.
    pub retention_turns: usize,
    /// Turns sent as context with each request.
    pub context_turns: usize,
    /// Distinct conversations held before least-recently-used ones are dropped.
    pub max_sessions: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retention_turns: DEFAULT_RETENTION_TURNS,
            context_turns: DEFAULT_CONTEXT_TURNS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptConfig {
    /// System instructions sent with every request.
    pub instructions: String,
    /// Fixed notice sent when an exchange fails.
    pub fallback_text: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplyConfig {
    /// Split long replies into sentence-bounded chunks.
    pub split: bool,
    pub target_chars: usize,
    pub delay_ms: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            split: false,
            target_chars: DEFAULT_SPLIT_TARGET_CHARS,
            delay_ms: DEFAULT_SPLIT_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FollowUpConfig {
    /// Successful exchanges before the follow-up is scheduled; 0 disables it.
    pub after_messages: u64,
    pub delay_secs: u64,
    pub text: String,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            after_messages: 0,
            delay_secs: DEFAULT_FOLLOW_UP_DELAY_SECS,
            text: DEFAULT_FOLLOW_UP_TEXT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
            json: false,
        }
    }
}
