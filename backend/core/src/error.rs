use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the Hermes relay.
///
/// Every variant is caught at the dispatcher boundary and turned into the
/// fixed fallback notice; the detail only ever reaches the log.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The completion service reported failure, returned a non-success
    /// status, or could not be reached at some stage of the protocol.
    #[error("upstream error during {stage}: {message}")]
    Upstream { stage: String, message: String },

    /// A bounded poll ran out of attempts before reaching a terminal status.
    #[error("timed out after {attempts} polling attempts ({waited:?})")]
    Timeout { attempts: u32, waited: Duration },

    /// Delivering a message back through the messaging transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RelayError {
    pub fn upstream(stage: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Upstream {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// Short machine-friendly label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upstream { .. } => "upstream",
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_display_names_stage() {
        let err = RelayError::upstream("create_run", "500 Internal Server Error");
        assert_eq!(
            err.to_string(),
            "upstream error during create_run: 500 Internal Server Error"
        );
        assert_eq!(err.kind(), "upstream");
    }

    #[test]
    fn timeout_reports_attempts() {
        let err = RelayError::Timeout {
            attempts: 30,
            waited: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30 polling attempts"));
        assert_eq!(err.kind(), "timeout");
    }
}
