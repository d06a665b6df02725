use std::sync::Arc;

use async_trait::async_trait;
use hermes_core::InboundHandler;

pub mod outbound;
pub mod reply_split;
pub mod telegram;

pub use outbound::{OutboundSender, SplitSettings, MAX_MESSAGE_LENGTH};
pub use reply_split::{hard_cut, split_reply};
pub use telegram::TelegramAdapter;

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Run the adapter's receive loop until shutdown, handing every inbound
    /// message to `inbound`.
    async fn start(&self, inbound: Arc<dyn InboundHandler>) -> anyhow::Result<()>;
}
