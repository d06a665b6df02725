use std::sync::Arc;

use async_trait::async_trait;
use hermes_core::{InboundHandler, InboundMessage};
use tracing::debug;

use crate::commands::{parse_command, CommandRouter};
use crate::dispatcher::InboundDispatcher;

/// Entry point for the transport: commands go to the command router,
/// everything else to the dispatcher.
pub struct MessageRouter {
    dispatcher: Arc<InboundDispatcher>,
    commands: CommandRouter,
}

impl MessageRouter {
    pub fn new(dispatcher: Arc<InboundDispatcher>, commands: CommandRouter) -> Self {
        Self {
            dispatcher,
            commands,
        }
    }
}

#[async_trait]
impl InboundHandler for MessageRouter {
    async fn handle(&self, message: InboundMessage) {
        let prefix = self.dispatcher.settings().command_prefix;
        if let Some(command) = message.text.as_deref().and_then(|t| parse_command(t, prefix)) {
            self.commands.run(&message.chat_id, command).await;
            return;
        }
        if message.text.is_none() {
            debug!(session_id = %message.chat_id, "Skipping non-text message");
        }
        self.dispatcher.dispatch(&message).await;
    }
}
