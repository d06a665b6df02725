//! Startup validation. Every problem is collected in one pass so the
//! operator sees the full list, not just the first failure.

use hermes_core::CompletionMode;
use thiserror::Error;

use crate::schema::HermesConfig;

/// A single invalid or missing value.
#[derive(Debug, Clone, Error)]
#[error("{path}: {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line per entry.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("  - {e}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn validate(config: &HermesConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_credentials(config, &mut report);
    validate_completion(config, &mut report);
    validate_session(config, &mut report);
    validate_reply(config, &mut report);
    report
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

fn validate_credentials(config: &HermesConfig, report: &mut ValidationReport) {
    if is_blank(&config.telegram.bot_token) {
        report.error("telegram.botToken", "TELEGRAM_TOKEN is required");
    }
    let mode = config.completion.mode;
    if mode != CompletionMode::Echo && is_blank(&config.completion.api_key) {
        report.error("completion.apiKey", "OPENAI_API_KEY is required");
    }
    if mode == CompletionMode::Assistants && is_blank(&config.completion.assistant_id) {
        report.error(
            "completion.assistantId",
            "ASSISTANT_ID is required in assistants mode",
        );
    }
}

fn validate_completion(config: &HermesConfig, report: &mut ValidationReport) {
    let completion = &config.completion;
    if completion.poll_max_attempts == 0 {
        report.error("completion.pollMaxAttempts", "must be at least 1");
    }
    if completion.poll_interval_ms == 0 {
        report.error("completion.pollIntervalMs", "must be greater than 0");
    }
    if completion.request_timeout_secs == 0 {
        report.error("completion.requestTimeoutSecs", "must be greater than 0");
    }
    if completion.mode != CompletionMode::Echo
        && !(completion.base_url.starts_with("http://") || completion.base_url.starts_with("https://"))
    {
        report.error("completion.baseUrl", "must be an http(s) URL");
    }
    if let Some(t) = completion.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.warn("completion.temperature", "outside the usual 0.0..=2.0 range");
        }
    }
    if completion.mode == CompletionMode::Echo {
        report.warn("completion.mode", "echo mode: replies are not generated");
    }
}

fn validate_session(config: &HermesConfig, report: &mut ValidationReport) {
    let session = &config.session;
    if session.retention_turns == 0 {
        report.error("session.retentionTurns", "must be at least 1");
    }
    if session.context_turns > session.retention_turns {
        report.error(
            "session.contextTurns",
            format!(
                "{} exceeds retentionTurns ({})",
                session.context_turns, session.retention_turns
            ),
        );
    }
    if session.max_sessions == 0 {
        report.error("session.maxSessions", "must be at least 1");
    }
}

fn validate_reply(config: &HermesConfig, report: &mut ValidationReport) {
    if config.reply.split && config.reply.target_chars == 0 {
        report.error("reply.targetChars", "must be greater than 0 when splitting");
    }
    if config.follow_up.after_messages > 0 && config.follow_up.text.trim().is_empty() {
        report.error("followUp.text", "must not be empty when follow-ups are enabled");
    }
}
