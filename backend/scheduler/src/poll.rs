//! Bounded polling: fixed interval, hard attempt ceiling.
//!
//! Every wait on remote state goes through [`poll_until`], so no caller can
//! spin forever on a status that never turns terminal.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Poll policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollPolicy {
    /// Wait before every check.
    #[serde(with = "millis")]
    pub interval: Duration,
    /// Maximum number of checks.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1_000),
            max_attempts: 30,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Worst-case wall-clock time spent sleeping.
    pub fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// How a poll ended, when no check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The termination predicate accepted this value.
    Ready(T),
    /// The ceiling was hit. `last` is the final observed value, if any.
    Exhausted { attempts: u32, last: Option<T> },
}

/// Sleep `policy.interval`, run `check`, repeat until `is_done` accepts the
/// value or `policy.max_attempts` checks have run.
///
/// `check` receives the 1-indexed attempt number. An error from `check`
/// ends the poll immediately and is returned unchanged.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    mut check: F,
    is_done: P,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let mut last = None;

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        let value = check(attempt).await?;
        if is_done(&value) {
            debug!(attempt, "Poll reached terminal value");
            return Ok(PollOutcome::Ready(value));
        }
        last = Some(value);
    }

    warn!(
        attempts = policy.max_attempts,
        ceiling_ms = policy.ceiling().as_millis() as u64,
        "Poll attempt ceiling exhausted"
    );
    Ok(PollOutcome::Exhausted {
        attempts: policy.max_attempts,
        last,
    })
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn returns_ready_on_first_accepted_value() {
        let policy = PollPolicy::new(Duration::from_millis(1), 10);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome = poll_until(
            &policy,
            |_| {
                let counter = counter.clone();
                async move { Ok::<_, ()>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
            },
            |n| *n == 3,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Ready(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_exact_attempts_within_ceiling() {
        let policy = PollPolicy::new(Duration::from_millis(20), 5);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let start = Instant::now();

        let outcome = poll_until(
            &policy,
            |attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(attempt)
                }
            },
            |_| false,
        )
        .await
        .unwrap();

        let elapsed = start.elapsed();
        assert_eq!(
            outcome,
            PollOutcome::Exhausted {
                attempts: 5,
                last: Some(5)
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(elapsed >= policy.ceiling(), "finished too early: {elapsed:?}");
        assert!(
            elapsed < policy.ceiling() + Duration::from_millis(500),
            "overran ceiling: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn check_error_aborts_immediately() {
        let policy = PollPolicy::new(Duration::from_millis(1), 10);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<PollOutcome<u32>, &str> = poll_until(
            &policy,
            |attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if attempt == 2 {
                        Err("connection reset")
                    } else {
                        Ok(attempt)
                    }
                }
            },
            |_| false,
        )
        .await;

        assert_eq!(result, Err("connection reset"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_attempts_never_checks() {
        let policy = PollPolicy::new(Duration::from_secs(60), 0);
        let outcome = poll_until(&policy, |_| async { Ok::<u32, ()>(1) }, |_| true)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Exhausted {
                attempts: 0,
                last: None
            }
        );
    }

    #[test]
    fn ceiling_is_interval_times_attempts() {
        let policy = PollPolicy::new(Duration::from_millis(1_500), 30);
        assert_eq!(policy.ceiling(), Duration::from_secs(45));
    }
}
