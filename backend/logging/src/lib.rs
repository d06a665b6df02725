//! Structured logging for Hermes.
//!
//! Console output (plain or JSON), optional daily-rotated NDJSON files, and
//! scrubbing of credentials before upstream error text reaches a log line.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LogSettings};
pub use redact::redact_sensitive_data;
