//! Outbound Sender: reply pacing on top of a raw transport sink.

use std::time::Duration;

use async_trait::async_trait;
use hermes_core::{RelayError, ReplySink};
use tracing::debug;

use crate::reply_split::{hard_cut, split_reply};

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSettings {
    pub target_chars: usize,
    /// Pause between consecutive chunks.
    pub delay: Duration,
}

/// Wraps a sink with optional reply splitting.
///
/// With splitting disabled every reply goes out as one message (hard-cut at
/// [`MAX_MESSAGE_LENGTH`] when needed). With splitting enabled the reply is
/// chunked by [`split_reply`] and the chunks are sent in order with a fixed
/// delay and a typing indicator in between. The first failed chunk aborts the
/// rest.
pub struct OutboundSender<S: ReplySink> {
    inner: S,
    split: Option<SplitSettings>,
    max_len: usize,
}

impl<S: ReplySink> OutboundSender<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            split: None,
            max_len: MAX_MESSAGE_LENGTH,
        }
    }

    pub fn with_split(mut self, split: Option<SplitSettings>) -> Self {
        self.split = split;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let pieces = match self.split {
            Some(split) => split_reply(text, split.target_chars),
            None if text.trim().is_empty() => Vec::new(),
            None => vec![text.to_string()],
        };
        pieces
            .iter()
            .flat_map(|piece| hard_cut(piece, self.max_len))
            .collect()
    }
}

#[async_trait]
impl<S: ReplySink> ReplySink for OutboundSender<S> {
    async fn send(&self, destination: &str, text: &str) -> Result<(), RelayError> {
        let chunks = self.chunks(text);
        let total = chunks.len();
        let delay = self.split.map(|s| s.delay).unwrap_or_default();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                // Typing between chunks is cosmetic; a failure is not fatal.
                let _ = self.inner.typing(destination).await;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            self.inner.send(destination, chunk).await?;
            debug!(destination, chunk = i + 1, total, "sent reply chunk");
        }
        Ok(())
    }

    async fn typing(&self, destination: &str) -> Result<(), RelayError> {
        self.inner.typing(destination).await
    }
}
