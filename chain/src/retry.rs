//! Bounded retry with a fixed backoff on rate limiting.
//!
//! Only [`ChainError::RateLimited`] is retried. Every other failure is
//! returned from the attempt that produced it.

use std::future::Future;
use std::time::Duration;

use crate::ChainError;

/// Default total attempts per query.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default pause between rate-limited attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(2_000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed sleep after each rate-limited attempt except the last.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

/// Run `op` until it stops reporting rate limiting or the attempt budget
/// is spent.
///
/// Exhausting the budget yields [`ChainError::RetryExhausted`] carrying the
/// number of attempts made.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    context: &str,
    mut op: F,
) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match op().await {
            Err(ChainError::RateLimited) => {
                if attempt < attempts {
                    tracing::debug!(
                        context,
                        attempt,
                        backoff_ms = policy.backoff.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            other => return other,
        }
    }

    tracing::warn!(context, attempts, "retry budget exhausted");
    Err(ChainError::RetryExhausted {
        attempts,
        context: context.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn success_needs_one_attempt() {
        let calls = &AtomicU32::new(0);
        let result = with_backoff(&fast(5), "ok", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ChainError>(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn always_rate_limited_exhausts_exact_budget() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&fast(6), "getObject", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ChainError::RateLimited)
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        match result {
            Err(ChainError::RetryExhausted { attempts, context }) => {
                assert_eq!(attempts, 6);
                assert_eq!(context, "getObject");
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recovers_after_transient_rate_limit() {
        let calls = &AtomicU32::new(0);
        let result = with_backoff(&fast(5), "list", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ChainError::RateLimited)
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&fast(5), "list", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ChainError::Transport("connection reset".into()))
        })
        .await;
        assert!(matches!(result, Err(ChainError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sleeps_between_attempts_only() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let start = Instant::now();
        let _: Result<(), _> =
            with_backoff(&policy, "list", || async { Err(ChainError::RateLimited) }).await;
        // Two sleeps for three attempts.
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
