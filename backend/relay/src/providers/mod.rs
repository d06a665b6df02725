pub mod assistants;
pub mod assistants_http;
pub mod chat;
pub mod echo;

use std::sync::Arc;
use std::time::Duration;

use hermes_core::{CompletionMode, CompletionRelay, RelayError};
use hermes_scheduler::PollPolicy;
use tracing::info;

use assistants::AssistantsRelay;
use assistants_http::HttpAssistantsApi;
use chat::ChatCompletionsRelay;
use echo::EchoRelay;

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub mode: CompletionMode,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub request_timeout: Duration,
    pub assistant_id: Option<String>,
    pub poll: PollPolicy,
}

/// Build the completion strategy selected by `settings.mode`.
pub fn build_relay(settings: &RelaySettings) -> Result<Arc<dyn CompletionRelay>, RelayError> {
    let relay: Arc<dyn CompletionRelay> = match settings.mode {
        CompletionMode::Chat => Arc::new(
            ChatCompletionsRelay::new(&settings.api_key, &settings.model, settings.request_timeout)?
                .with_base_url(&settings.base_url)
                .with_max_tokens(settings.max_tokens)
                .with_temperature(settings.temperature),
        ),
        CompletionMode::Assistants => {
            let assistant_id = settings.assistant_id.as_deref().ok_or_else(|| {
                RelayError::Config("assistants mode requires an assistant id".into())
            })?;
            let api = HttpAssistantsApi::new(&settings.api_key, assistant_id, settings.request_timeout)?
                .with_base_url(&settings.base_url);
            Arc::new(AssistantsRelay::new(api, settings.poll))
        }
        CompletionMode::Echo => Arc::new(EchoRelay::new()),
    };

    info!(
        mode = %settings.mode,
        model = %settings.model,
        poll_interval_ms = settings.poll.interval.as_millis() as u64,
        poll_max_attempts = settings.poll.max_attempts,
        "Completion relay ready"
    );
    Ok(relay)
}
