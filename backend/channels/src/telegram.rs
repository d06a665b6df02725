use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hermes_core::{InboundHandler, InboundMessage, MessageFormat, RelayError, ReplySink};
use hermes_logging::redact_sensitive_data;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use teloxide::RequestError;
use tracing::{debug, info, warn};

use crate::ChannelAdapter;

/// Telegram long-polling transport.
///
/// Inbound text messages are handed to the [`InboundHandler`] on their own
/// task so a slow completion never blocks delivery of other chats' messages.
/// Replies are sent with the configured parse mode; text Telegram cannot
/// parse is resent as plain text.
#[derive(Clone)]
pub struct TelegramAdapter {
    bot: Bot,
    parse_mode: Option<ParseMode>,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
            parse_mode: parse_mode_for(MessageFormat::default()),
        }
    }

    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.parse_mode = parse_mode_for(format);
        self
    }

    fn chat_id(destination: &str) -> Result<ChatId, RelayError> {
        destination
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| RelayError::Transport(format!("invalid telegram chat id '{destination}'")))
    }
}

pub(crate) fn parse_mode_for(format: MessageFormat) -> Option<ParseMode> {
    match format {
        MessageFormat::Plain => None,
        #[allow(deprecated)]
        MessageFormat::Markdown => Some(ParseMode::Markdown),
        MessageFormat::MarkdownV2 => Some(ParseMode::MarkdownV2),
        MessageFormat::Html => Some(ParseMode::Html),
    }
}

/// Telegram refused the message markup.
fn is_entity_error(error: &RequestError) -> bool {
    match error {
        RequestError::Api(api) => api
            .to_string()
            .to_ascii_lowercase()
            .contains("can't parse entities"),
        _ => false,
    }
}

/// Bot API errors can echo the request URL, which embeds the bot token.
fn transport_error(error: &RequestError) -> RelayError {
    RelayError::Transport(redact_sensitive_data(&error.to_string()))
}

/// Send with `parse_mode`, retrying once without markup when Telegram
/// rejects the entities.
pub(crate) async fn send_formatted<F, Fut>(
    parse_mode: Option<ParseMode>,
    mut send: F,
) -> Result<(), RequestError>
where
    F: FnMut(Option<ParseMode>) -> Fut,
    Fut: Future<Output = Result<(), RequestError>>,
{
    match send(parse_mode).await {
        Err(e) if parse_mode.is_some() && is_entity_error(&e) => {
            warn!(error = %e, "Telegram rejected reply markup; resending as plain text");
            send(None).await
        }
        other => other,
    }
}

/// Map a Telegram update into the transport-neutral form.
///
/// Returns `None` for updates without text (stickers, photos, joins).
pub(crate) fn to_inbound(chat_id: i64, username: Option<&str>, text: Option<&str>) -> Option<InboundMessage> {
    let text = text?;
    Some(InboundMessage {
        chat_id: chat_id.to_string(),
        sender: username.map(str::to_string),
        text: Some(text.to_string()),
        received_at: Utc::now(),
    })
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self, inbound: Arc<dyn InboundHandler>) -> anyhow::Result<()> {
        info!("starting Telegram adapter");

        let handler = Update::filter_message().endpoint(
            |msg: Message, inbound: Arc<dyn InboundHandler>| async move {
                match to_inbound(msg.chat.id.0, msg.chat.username(), msg.text()) {
                    Some(message) => {
                        debug!(chat_id = %message.chat_id, "received telegram text message");
                        tokio::spawn(async move { inbound.handle(message).await });
                    }
                    None => debug!(chat_id = msg.chat.id.0, "ignoring non-text telegram message"),
                }
                respond(())
            },
        );

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![inbound])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram adapter stopped");
        Ok(())
    }
}

#[async_trait]
impl ReplySink for TelegramAdapter {
    async fn send(&self, destination: &str, text: &str) -> Result<(), RelayError> {
        let chat = Self::chat_id(destination)?;
        send_formatted(self.parse_mode, |mode| {
            let mut request = self.bot.send_message(chat, text);
            if let Some(mode) = mode {
                request = request.parse_mode(mode);
            }
            async move { request.await.map(|_| ()) }
        })
        .await
        .map_err(|e| transport_error(&e))
    }

    async fn typing(&self, destination: &str) -> Result<(), RelayError> {
        let chat = Self::chat_id(destination)?;
        self.bot
            .send_chat_action(chat, ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(|e| transport_error(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use teloxide::ApiError;

    fn api_error(description: &str) -> RequestError {
        RequestError::Api(ApiError::Unknown(description.to_string()))
    }

    #[test]
    fn text_updates_become_inbound_messages() {
        let msg = to_inbound(-1001, Some("alice"), Some("hello")).unwrap();
        assert_eq!(msg.chat_id, "-1001");
        assert_eq!(msg.sender.as_deref(), Some("alice"));
        assert_eq!(msg.text.as_deref(), Some("hello"));
    }

    #[test]
    fn non_text_updates_are_dropped() {
        assert!(to_inbound(7, None, None).is_none());
    }

    #[test]
    fn rejects_non_numeric_destination() {
        let err = TelegramAdapter::chat_id("@channel").unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert_eq!(TelegramAdapter::chat_id("42").unwrap(), ChatId(42));
    }

    #[test]
    fn format_maps_to_parse_mode() {
        assert_eq!(parse_mode_for(MessageFormat::Plain), None);
        assert_eq!(parse_mode_for(MessageFormat::MarkdownV2), Some(ParseMode::MarkdownV2));
        assert_eq!(parse_mode_for(MessageFormat::Html), Some(ParseMode::Html));
    }

    #[tokio::test]
    async fn unparsable_markup_is_resent_as_plain_text() {
        let attempts = Mutex::new(Vec::new());
        let result = send_formatted(Some(ParseMode::MarkdownV2), |mode| {
            attempts.lock().unwrap().push(mode);
            let outcome = match mode {
                Some(_) => Err(api_error(
                    "Bad Request: can't parse entities: Can't find end of the entity starting at byte offset 4",
                )),
                None => Ok(()),
            };
            async move { outcome }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(*attempts.lock().unwrap(), vec![Some(ParseMode::MarkdownV2), None]);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let attempts = Mutex::new(0);
        let result = send_formatted(Some(ParseMode::Html), |_| {
            *attempts.lock().unwrap() += 1;
            async { Err(api_error("Forbidden: bot was blocked by the user")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(*attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn plain_mode_sends_once() {
        let attempts = Mutex::new(Vec::new());
        send_formatted(None, |mode| {
            attempts.lock().unwrap().push(mode);
            async { Ok(()) }
        })
        .await
        .unwrap();
        assert_eq!(*attempts.lock().unwrap(), vec![None]);
    }

    #[test]
    fn transport_errors_hide_bot_token() {
        let err = transport_error(&api_error(
            "request to https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw/sendMessage failed",
        ));
        let text = err.to_string();
        assert!(!text.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(text.contains("[REDACTED_BOT_TOKEN]"));
    }
}
