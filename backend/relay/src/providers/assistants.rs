//! Run-based completion: thread → message → run → poll → read reply.
//!
//! The remote service executes the run out-of-band; the relay waits for it
//! with [`poll_until`], so a run that never finishes costs at most
//! `interval × max_attempts` before failing with `Timeout`. Threads and runs
//! left behind by a failure are not cleaned up remotely, only logged.

use std::time::Instant;

use async_trait::async_trait;
use hermes_core::{Completion, CompletionRelay, CompletionRequest, RelayError, RunStatus};
use hermes_scheduler::{poll_until, PollOutcome, PollPolicy};
use tracing::{debug, info, instrument, warn};

/// A server-side run as last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRun {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
}

/// The remote calls the run-based protocol needs.
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    async fn create_thread(&self) -> Result<String, RelayError>;

    async fn add_message(&self, thread_id: &str, text: &str) -> Result<(), RelayError>;

    /// Start a run. `instructions` are appended to the assistant's own.
    async fn create_run(
        &self,
        thread_id: &str,
        instructions: Option<&str>,
    ) -> Result<RemoteRun, RelayError>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RemoteRun, RelayError>;

    /// Text of the newest assistant message produced by `run_id`, if any.
    async fn latest_assistant_message(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Option<String>, RelayError>;
}

pub struct AssistantsRelay<A> {
    api: A,
    policy: PollPolicy,
}

impl<A: AssistantsApi> AssistantsRelay<A> {
    pub fn new(api: A, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    async fn run_on_thread(
        &self,
        thread_id: &str,
        request: &CompletionRequest,
    ) -> Result<(String, String), RelayError> {
        self.api.add_message(thread_id, &request.user_text).await?;

        let instructions = Some(request.instructions.as_str()).filter(|s| !s.is_empty());
        let run = self.api.create_run(thread_id, instructions).await?;
        debug!(run_id = %run.id, status = ?run.status, "Run created");

        let api = &self.api;
        let run_id = run.id.as_str();
        let started = Instant::now();
        let outcome = poll_until(
            &self.policy,
            |attempt| async move {
                let run = api.get_run(thread_id, run_id).await?;
                debug!(run_id, attempt, status = ?run.status, "Polled run");
                Ok::<_, RelayError>(run)
            },
            |run| run.status.is_terminal(),
        )
        .await
        .inspect_err(|e| warn!(run_id, error = %e, "Polling failed; run left running remotely"))?;

        let finished = match outcome {
            PollOutcome::Ready(run) => run,
            PollOutcome::Exhausted { attempts, last } => {
                warn!(
                    run_id,
                    attempts,
                    last_status = ?last.map(|r| r.status),
                    "Run did not finish in time; orphaning it"
                );
                return Err(RelayError::Timeout {
                    attempts,
                    waited: started.elapsed(),
                });
            }
        };

        match finished.status {
            RunStatus::Completed => {}
            other => {
                return Err(RelayError::upstream(
                    "run",
                    format!("run {run_id} ended with status {other:?}"),
                ));
            }
        }

        let text = self
            .api
            .latest_assistant_message(thread_id, run_id)
            .await?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                RelayError::upstream("list_messages", format!("run {run_id} produced no assistant text"))
            })?;

        Ok((text, run.id))
    }
}

#[async_trait]
impl<A: AssistantsApi> CompletionRelay for AssistantsRelay<A> {
    fn name(&self) -> &str {
        "assistants"
    }

    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RelayError> {
        let (thread_id, created) = match &request.thread_id {
            Some(id) => (id.clone(), false),
            None => {
                let id = self.api.create_thread().await?;
                info!(thread_id = %id, "Created remote thread");
                (id, true)
            }
        };

        match self.run_on_thread(&thread_id, request).await {
            Ok((text, run_id)) => Ok(Completion {
                text,
                thread_id: Some(thread_id),
                run_id: Some(run_id),
            }),
            Err(e) => {
                if created {
                    warn!(thread_id = %thread_id, "Exchange failed; newly created thread is orphaned");
                }
                Err(e)
            }
        }
    }
}
