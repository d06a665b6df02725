//! Default values for every tunable.

pub const DEFAULT_COMMAND_PREFIX: char = '/';

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Poll every second, give up after 30 checks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 30;

pub const DEFAULT_RETENTION_TURNS: usize = 20;
pub const DEFAULT_CONTEXT_TURNS: usize = 10;
pub const DEFAULT_MAX_SESSIONS: u64 = 10_000;

pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a friendly, concise assistant chatting with a user in a messenger.";
pub const DEFAULT_FALLBACK_TEXT: &str = "⚠️ Temporary error. Please try again.";

pub const DEFAULT_SPLIT_TARGET_CHARS: usize = 100;
pub const DEFAULT_SPLIT_DELAY_MS: u64 = 1_200;

pub const DEFAULT_FOLLOW_UP_DELAY_SECS: u64 = 600;
pub const DEFAULT_FOLLOW_UP_TEXT: &str = "How is our conversation going so far? Any feedback is welcome.";

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_LOG_LEVEL: &str = "info";
