//! Bounded retry with a fixed pause, shared by every storage call.
//!
//! Only transient storage errors are retried. The pause blocks the calling
//! action; there is no cancellation and no deadline beyond the attempt bound.

use std::future::Future;
use std::time::Duration;

use storage::repository::StorageError;

/// Retry behaviour for sink and source calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    /// Three attempts, two seconds apart.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// The last error seen once a policy gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub source: StorageError,
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; zero is treated as one.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy without a pause between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Runs `op` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// # Errors
    ///
    /// Returns `RetryExhausted` with the attempt count and the last error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient storage failure, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(source) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_up_to_bound() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::immediate(3);
        let err = policy
            .run("append", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StorageError::Busy("locked".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.source, StorageError::Busy("locked".into()));
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = RetryPolicy::immediate(3)
            .run("append", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StorageError::Rejected("quota".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let value = RetryPolicy::immediate(3)
            .run("read", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(StorageError::Connection("reset".into()))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn default_policy_waits_between_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff(), Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        let _ = policy
            .run("append", || async {
                Err::<(), _>(StorageError::Connection("down".into()))
            })
            .await;
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
