use std::time::{Duration, Instant};

use async_trait::async_trait;
use hermes_core::{Completion, CompletionRelay, CompletionRequest, RelayError};
use hermes_logging::redact_sensitive_data;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Single-shot chat completions: the whole context in one request, the reply
/// in the same round-trip. Timeouts are the HTTP client's.
pub struct ChatCompletionsRelay {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl ChatCompletionsRelay {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn build_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
    request
        .ordered_messages()
        .into_iter()
        .map(|(role, content)| ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        })
        .collect()
}

fn extract_reply(response: ChatResponse) -> Result<String, RelayError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| RelayError::upstream("chat_completion", "response contained no reply text"))
}

#[async_trait]
impl CompletionRelay for ChatCompletionsRelay {
    fn name(&self) -> &str {
        "chat"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RelayError> {
        let start = Instant::now();

        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(request),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            model = %self.model,
            messages = body.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::upstream("chat_completion", redact_sensitive_data(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RelayError::upstream(
                "chat_completion",
                format!("{status}: {}", redact_sensitive_data(&error_body)),
            ));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            RelayError::upstream("chat_completion", format!("unparseable response: {e}"))
        })?;

        let tokens_used = chat_response
            .usage
            .as_ref()
            .and_then(|u| u.total_tokens)
            .unwrap_or(0);
        let text = extract_reply(chat_response)?;

        debug!(
            model = %self.model,
            tokens_used,
            latency_ms = start.elapsed().as_millis() as u64,
            "Chat completion received"
        );

        Ok(Completion::text(text))
    }
}
