//! Inbound dispatcher: one message in, one exchange out.
//!
//! look up session → build context → complete → record exchange → reply.
//! Any failure becomes the fixed fallback notice and leaves the session as it was.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hermes_core::{CompletionRelay, InboundHandler, InboundMessage, RelayError, ReplySink, Turn};
use hermes_scheduler::FollowUpScheduler;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::context_window::ContextWindow;
use crate::session_store::SessionStore;

pub const DEFAULT_FALLBACK_TEXT: &str = "⚠️ Temporary error. Please try again.";

/// Delayed prompt sent once a session reaches a number of successful exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpSettings {
    pub after_messages: u64,
    pub delay: Duration,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub instructions: String,
    /// Turns of history sent with each request.
    pub context_turns: usize,
    /// Turns kept in the session after each exchange.
    pub retention_turns: usize,
    pub command_prefix: char,
    pub fallback_text: String,
    pub follow_up: Option<FollowUpSettings>,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            instructions: String::new(),
            context_turns: 10,
            retention_turns: 20,
            command_prefix: '/',
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            follow_up: None,
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Empty, non-text, or a control command.
    Ignored,
    /// The exchange was recorded and the reply handed to the sink.
    Replied,
    /// The relay failed; the fallback notice was sent instead.
    Failed,
}

pub struct InboundDispatcher {
    store: Arc<SessionStore>,
    relay: Arc<dyn CompletionRelay>,
    sink: Arc<dyn ReplySink>,
    follow_ups: FollowUpScheduler,
    settings: DispatcherSettings,
}

impl InboundDispatcher {
    pub fn new(
        store: Arc<SessionStore>,
        relay: Arc<dyn CompletionRelay>,
        sink: Arc<dyn ReplySink>,
        follow_ups: FollowUpScheduler,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            store,
            relay,
            sink,
            follow_ups,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    fn should_ignore(&self, text: Option<&str>) -> bool {
        match text.map(str::trim) {
            None | Some("") => true,
            Some(t) => t.starts_with(self.settings.command_prefix),
        }
    }

    /// Run one exchange for `message`.
    #[instrument(
        skip(self, message),
        fields(session_id = %message.chat_id, exchange_id = %Uuid::new_v4())
    )]
    pub async fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        if self.should_ignore(message.text.as_deref()) {
            debug!("Ignoring empty or command message");
            return DispatchOutcome::Ignored;
        }
        let text = message.text.as_deref().unwrap_or_default().trim();
        let chat_id = message.chat_id.as_str();

        let permit = self.store.acquire(chat_id).await;

        if let Err(e) = self.sink.typing(chat_id).await {
            debug!(error = %e, "Typing indicator failed");
        }

        let session = permit.session();
        let window = ContextWindow::build(
            &session,
            &self.settings.instructions,
            self.settings.context_turns,
            text,
        );
        let request = window.to_request(&session);

        let start = Instant::now();
        let result = self.relay.complete(&request).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(completion) => {
                let count = self.store.record_exchange(
                    &permit,
                    window.incoming,
                    Turn::assistant(completion.text.clone()),
                    completion.thread_id,
                    self.settings.retention_turns,
                );
                info!(
                    relay = self.relay.name(),
                    elapsed_ms,
                    message_count = count,
                    "Exchange completed"
                );

                if let Err(e) = self.sink.send(chat_id, &completion.text).await {
                    error!(error = %e, "Failed to deliver reply");
                }
                self.maybe_schedule_follow_up(chat_id, count).await;
                DispatchOutcome::Replied
            }
            Err(e) => {
                self.report_failure(&e, elapsed_ms);
                if let Err(send_err) = self.sink.send(chat_id, &self.settings.fallback_text).await {
                    error!(error = %send_err, "Failed to deliver fallback notice");
                }
                DispatchOutcome::Failed
            }
        }
    }

    fn report_failure(&self, e: &RelayError, elapsed_ms: u64) {
        match e {
            RelayError::Timeout { .. } => {
                warn!(relay = self.relay.name(), kind = e.kind(), error = %e, elapsed_ms, "Completion timed out")
            }
            _ => {
                error!(relay = self.relay.name(), kind = e.kind(), error = %e, elapsed_ms, "Completion failed")
            }
        }
    }

    async fn maybe_schedule_follow_up(&self, chat_id: &str, count: u64) {
        let Some(follow_up) = &self.settings.follow_up else {
            return;
        };
        if follow_up.after_messages == 0 || count != follow_up.after_messages {
            return;
        }

        let sink = Arc::clone(&self.sink);
        let destination = chat_id.to_string();
        let text = follow_up.text.clone();
        self.follow_ups
            .schedule(chat_id, follow_up.delay, async move {
                if let Err(e) = sink.send(&destination, &text).await {
                    error!(session_id = %destination, error = %e, "Failed to deliver follow-up");
                }
            })
            .await;
        debug!(session_id = %chat_id, delay_ms = follow_up.delay.as_millis() as u64, "Follow-up scheduled");
    }
}

#[async_trait]
impl InboundHandler for InboundDispatcher {
    async fn handle(&self, message: InboundMessage) {
        self.dispatch(&message).await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hermes_core::{Completion, CompletionRequest, Role};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    /// Replies with the user text, prefixed.
    pub(crate) struct EchoRelay;

    #[async_trait]
    impl CompletionRelay for EchoRelay {
        fn name(&self) -> &str {
            "echo"
        }
        async fn complete(&self, req: &CompletionRequest) -> Result<Completion, RelayError> {
            Ok(Completion {
                text: format!("echo: {}", req.user_text),
                thread_id: Some(format!("thread-{}", req.session_id)),
                run_id: None,
            })
        }
    }

    struct FailingRelay {
        calls: AtomicU32,
        error: fn() -> RelayError,
    }

    #[async_trait]
    impl CompletionRelay for FailingRelay {
        fn name(&self) -> &str {
            "failing"
        }
        async fn complete(&self, _req: &CompletionRequest) -> Result<Completion, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err((self.error)())
        }
    }

    /// Captures every message sent, in order.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) sent: Mutex<Vec<(String, String)>>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl ReplySink for RecordingSink {
        async fn send(&self, destination: &str, text: &str) -> Result<(), RelayError> {
            if self.fail {
                return Err(RelayError::Transport("network down".into()));
            }
            self.sent
                .lock()
                .await
                .push((destination.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn dispatcher(
        relay: Arc<dyn CompletionRelay>,
        sink: Arc<RecordingSink>,
        settings: DispatcherSettings,
    ) -> (InboundDispatcher, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::default());
        let d = InboundDispatcher::new(
            Arc::clone(&store),
            relay,
            sink,
            FollowUpScheduler::new(),
            settings,
        );
        (d, store)
    }

    #[tokio::test]
    async fn ignores_empty_and_commands() {
        let sink = Arc::new(RecordingSink::default());
        let (d, store) = dispatcher(Arc::new(EchoRelay), sink.clone(), DispatcherSettings::default());

        assert_eq!(d.dispatch(&InboundMessage::text("1", "")).await, DispatchOutcome::Ignored);
        assert_eq!(d.dispatch(&InboundMessage::text("1", "   ")).await, DispatchOutcome::Ignored);
        assert_eq!(d.dispatch(&InboundMessage::text("1", "/start")).await, DispatchOutcome::Ignored);
        let mut sticker = InboundMessage::text("1", "");
        sticker.text = None;
        assert_eq!(d.dispatch(&sticker).await, DispatchOutcome::Ignored);

        assert!(sink.sent.lock().await.is_empty());
        assert!(store.snapshot("1").is_none());
    }

    #[tokio::test]
    async fn echoed_reply_is_latest_assistant_turn_in_next_context() {
        let sink = Arc::new(RecordingSink::default());
        let (d, store) = dispatcher(Arc::new(EchoRelay), sink.clone(), DispatcherSettings::default());

        let outcome = d.dispatch(&InboundMessage::text("chat-7", "hello there")).await;
        assert_eq!(outcome, DispatchOutcome::Replied);

        let session = store.get_or_create("chat-7");
        let next = ContextWindow::build(&session, "", 10, "second message");
        let last = next.history.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, "echo: hello there");
        assert_eq!(session.thread_id.as_deref(), Some("thread-chat-7"));
        assert_eq!(session.message_count, 1);

        let sent = sink.sent.lock().await;
        assert_eq!(sent.as_slice(), &[("chat-7".to_string(), "echo: hello there".to_string())]);
    }

    #[tokio::test]
    async fn retention_window_applies_after_each_exchange() {
        let sink = Arc::new(RecordingSink::default());
        let settings = DispatcherSettings {
            retention_turns: 4,
            context_turns: 4,
            ..Default::default()
        };
        let (d, store) = dispatcher(Arc::new(EchoRelay), sink, settings);

        for i in 0..5 {
            d.dispatch(&InboundMessage::text("c", format!("m{i}"))).await;
        }
        let session = store.snapshot("c").unwrap();
        let texts: Vec<_> = session.turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["m3", "echo: m3", "m4", "echo: m4"]);
        assert_eq!(session.message_count, 5);
    }

    #[tokio::test]
    async fn failure_sends_fallback_and_leaves_session_untouched() {
        for make in [
            (|| RelayError::upstream("create_run", "500")) as fn() -> RelayError,
            || RelayError::Timeout {
                attempts: 3,
                waited: Duration::from_secs(3),
            },
        ] {
            let sink = Arc::new(RecordingSink::default());
            let relay = Arc::new(FailingRelay {
                calls: AtomicU32::new(0),
                error: make,
            });
            let (d, store) = dispatcher(relay.clone(), sink.clone(), DispatcherSettings::default());

            {
                let permit = store.acquire("c").await;
                store.record_exchange(&permit, Turn::user("q"), Turn::assistant("a"), None, 20);
            }
            let before = store.snapshot("c").unwrap();

            let outcome = d.dispatch(&InboundMessage::text("c", "will fail")).await;
            assert_eq!(outcome, DispatchOutcome::Failed);
            assert_eq!(relay.calls.load(Ordering::SeqCst), 1);

            let after = store.snapshot("c").unwrap();
            assert_eq!(after.turns, before.turns);
            assert_eq!(after.message_count, 1);

            let sent = sink.sent.lock().await;
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].1, DEFAULT_FALLBACK_TEXT);
            assert!(!sent[0].1.contains("500"));
        }
    }

    #[tokio::test]
    async fn transport_failure_does_not_panic() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let (d, store) = dispatcher(Arc::new(EchoRelay), sink, DispatcherSettings::default());

        let outcome = d.dispatch(&InboundMessage::text("c", "hi")).await;
        assert_eq!(outcome, DispatchOutcome::Replied);
        assert_eq!(store.snapshot("c").unwrap().message_count, 1);
    }

    #[tokio::test]
    async fn follow_up_fires_after_threshold() {
        let sink = Arc::new(RecordingSink::default());
        let settings = DispatcherSettings {
            follow_up: Some(FollowUpSettings {
                after_messages: 2,
                delay: Duration::from_millis(20),
                text: "How was that?".into(),
            }),
            ..Default::default()
        };
        let (d, _store) = dispatcher(Arc::new(EchoRelay), sink.clone(), settings);

        d.dispatch(&InboundMessage::text("c", "one")).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(sink.sent.lock().await.len(), 1);

        d.dispatch(&InboundMessage::text("c", "two")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let sent = sink.sent.lock().await;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].1, "How was that?");
    }

    #[tokio::test]
    async fn concurrent_messages_in_one_session_are_serialized() {
        struct SlowRelay;
        #[async_trait]
        impl CompletionRelay for SlowRelay {
            fn name(&self) -> &str {
                "slow"
            }
            async fn complete(&self, req: &CompletionRequest) -> Result<Completion, RelayError> {
                let delay = if req.user_text == "first" { 60 } else { 1 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(Completion::text(format!("re: {}", req.user_text)))
            }
        }

        let sink = Arc::new(RecordingSink::default());
        let (d, store) = dispatcher(Arc::new(SlowRelay), sink, DispatcherSettings::default());
        let d = Arc::new(d);

        let first = {
            let d = Arc::clone(&d);
            tokio::spawn(async move { d.dispatch(&InboundMessage::text("c", "first")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = {
            let d = Arc::clone(&d);
            tokio::spawn(async move { d.dispatch(&InboundMessage::text("c", "second")).await })
        };
        first.await.unwrap();
        second.await.unwrap();

        let texts: Vec<_> = store
            .snapshot("c")
            .unwrap()
            .turns
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["first", "re: first", "second", "re: second"]);
    }
}
