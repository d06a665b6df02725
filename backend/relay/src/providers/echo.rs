use async_trait::async_trait;
use hermes_core::{Completion, CompletionRelay, CompletionRequest, RelayError};

const ECHO_PREFIX: &str = "echo: ";

/// A relay that answers with the user's own text. No network involved.
#[derive(Debug, Default)]
pub struct EchoRelay;

impl EchoRelay {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompletionRelay for EchoRelay {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RelayError> {
        Ok(Completion::text(format!("{ECHO_PREFIX}{}", request.user_text)))
    }
}
