use std::time::Duration;

use async_trait::async_trait;
use hermes_core::{RelayError, RunStatus};
use hermes_logging::redact_sensitive_data;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::assistants::{AssistantsApi, RemoteRun};

/// Assistants API over HTTP (`/threads`, `/threads/{id}/messages`, `/threads/{id}/runs`).
pub struct HttpAssistantsApi {
    client: Client,
    api_key: String,
    assistant_id: String,
    base_url: String,
}

impl HttpAssistantsApi {
    pub fn new(
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        stage: &str,
        builder: RequestBuilder,
    ) -> Result<T, RelayError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| RelayError::upstream(stage, redact_sensitive_data(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::upstream(
                stage,
                format!("{status}: {}", redact_sensitive_data(&body)),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| RelayError::upstream(stage, format!("unparseable response: {e}")))
    }
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    thread_id: String,
    status: String,
}

impl From<RunObject> for RemoteRun {
    fn from(run: RunObject) -> Self {
        Self {
            status: RunStatus::from_api(&run.status),
            id: run.id,
            thread_id: run.thread_id,
        }
    }
}

#[derive(Serialize)]
struct CreateRun<'a> {
    assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_instructions: Option<&'a str>,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    run_id: Option<String>,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<TextValue>,
}

#[derive(Deserialize)]
struct TextValue {
    value: String,
}

/// Newest assistant message for `run_id` (list is newest first), text parts joined.
fn assistant_text(list: MessageList, run_id: &str) -> Option<String> {
    let message = list.data.into_iter().find(|m| {
        m.role == "assistant" && m.run_id.as_deref().is_none_or(|id| id == run_id)
    })?;

    let parts: Vec<String> = message
        .content
        .into_iter()
        .filter(|p| p.kind == "text")
        .filter_map(|p| p.text.map(|t| t.value))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

#[async_trait]
impl AssistantsApi for HttpAssistantsApi {
    async fn create_thread(&self) -> Result<String, RelayError> {
        let created: Created = self
            .send_json(
                "create_thread",
                self.client.post(self.url("/threads")).json(&json!({})),
            )
            .await?;
        Ok(created.id)
    }

    async fn add_message(&self, thread_id: &str, text: &str) -> Result<(), RelayError> {
        let _: Created = self
            .send_json(
                "add_message",
                self.client
                    .post(self.url(&format!("/threads/{thread_id}/messages")))
                    .json(&json!({ "role": "user", "content": text })),
            )
            .await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        instructions: Option<&str>,
    ) -> Result<RemoteRun, RelayError> {
        let body = CreateRun {
            assistant_id: &self.assistant_id,
            additional_instructions: instructions,
        };
        let run: RunObject = self
            .send_json(
                "create_run",
                self.client
                    .post(self.url(&format!("/threads/{thread_id}/runs")))
                    .json(&body),
            )
            .await?;
        Ok(run.into())
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RemoteRun, RelayError> {
        let run: RunObject = self
            .send_json(
                "get_run",
                self.client
                    .get(self.url(&format!("/threads/{thread_id}/runs/{run_id}"))),
            )
            .await?;
        Ok(run.into())
    }

    async fn latest_assistant_message(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Option<String>, RelayError> {
        let list: MessageList = self
            .send_json(
                "list_messages",
                self.client
                    .get(self.url(&format!("/threads/{thread_id}/messages")))
                    .query(&[("order", "desc"), ("limit", "20"), ("run_id", run_id)]),
            )
            .await?;
        Ok(assistant_text(list, run_id))
    }
}
