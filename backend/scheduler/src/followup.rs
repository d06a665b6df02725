//! One-shot delayed follow-ups keyed by session.
//!
//! A session has at most one pending follow-up. Scheduling again replaces
//! the previous timer; resetting the session cancels it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Clone, Default)]
pub struct FollowUpScheduler {
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    generation: Arc<AtomicU64>,
}

impl FollowUpScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once after `delay`, replacing any follow-up already pending for `key`.
    pub async fn schedule<F>(&self, key: impl Into<String>, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let task_key = key.clone();

        // Held across the spawn so a zero-delay task cannot fire before it is registered.
        let mut map = self.pending.lock().await;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut map = pending.lock().await;
                if map.get(&task_key).map(|p| p.generation) == Some(generation) {
                    map.remove(&task_key);
                }
            }
            debug!(session_id = %task_key, "Follow-up firing");
            task.await;
        });

        if let Some(previous) = map.insert(key.clone(), Pending { generation, handle }) {
            previous.handle.abort();
            debug!(session_id = %key, "Replaced pending follow-up");
        }
    }

    /// Abort the pending follow-up for `key`. Returns whether one was pending.
    pub async fn cancel(&self, key: &str) -> bool {
        match self.pending.lock().await.remove(key) {
            Some(p) => {
                p.handle.abort();
                debug!(session_id = %key, "Cancelled follow-up");
                true
            }
            None => false,
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counter_task(counter: &Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn fires_once_after_delay() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        scheduler
            .schedule("chat-1", Duration::from_millis(20), counter_task(&fired))
            .await;
        assert_eq!(scheduler.pending_count().await, 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test]
    async fn cancel_prevents_firing() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        scheduler
            .schedule("chat-1", Duration::from_millis(50), counter_task(&fired))
            .await;
        assert!(scheduler.cancel("chat-1").await);
        assert!(!scheduler.cancel("chat-1").await);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rescheduling_replaces_previous_timer() {
        let scheduler = FollowUpScheduler::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        scheduler
            .schedule("chat-1", Duration::from_millis(30), counter_task(&first))
            .await;
        scheduler
            .schedule("chat-1", Duration::from_millis(30), counter_task(&second))
            .await;
        assert_eq!(scheduler.pending_count().await, 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        scheduler
            .schedule("chat-1", Duration::from_millis(20), counter_task(&fired))
            .await;
        scheduler
            .schedule("chat-2", Duration::from_millis(20), counter_task(&fired))
            .await;
        scheduler.cancel("chat-1").await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
