use async_trait::async_trait;

use crate::error::RelayError;
use crate::message::{Completion, CompletionRequest, InboundMessage};

/// A strategy for turning accumulated context into a reply.
#[async_trait]
pub trait CompletionRelay: Send + Sync {
    /// Strategy name (e.g., "chat", "assistants").
    fn name(&self) -> &str;

    /// Produce one reply. Fails with `Upstream` or `Timeout`; never hangs
    /// past the strategy's own bound.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RelayError>;
}

/// Somewhere replies can be delivered.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<(), RelayError>;

    /// Show a "typing" indicator. Best-effort; sinks without one do nothing.
    async fn typing(&self, _destination: &str) -> Result<(), RelayError> {
        Ok(())
    }
}

/// Consumer of inbound transport messages.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage);
}
