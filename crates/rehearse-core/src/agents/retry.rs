//! Bounded retry with exponential backoff and jitter for agent calls.
//!
//! Transient provider failures (network errors, 5xx, 429) are retried;
//! everything else short-circuits. A provider-supplied retry-after hint
//! overrides the computed backoff. Waits are cancellation-aware.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use rehearse_types::error::AgentError;

/// Retry tuning for one category of agent call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retry).
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following `attempt` (1-based), with jitter.
    fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        if let Some(secs) = retry_after_secs {
            return Duration::from_secs(secs);
        }
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << (attempt - 1).min(16))
            .min(self.max_delay_ms);
        let jitter = rand::rng().random_range(0..=self.base_delay_ms / 2);
        Duration::from_millis(exp + jitter)
    }
}

/// Run `call` until it succeeds, fails non-transiently, exhausts the
/// policy, or the token is cancelled.
///
/// A retried call counts as one logical operation from the caller's point
/// of view; any provider permit held by the caller stays held across
/// attempts.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, AgentError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AgentError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;

        if cancel.is_cancelled() {
            return Err(AgentError::Timeout);
        }

        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) if attempt >= policy.max_attempts => return Err(err),
            Err(err) => {
                let retry_after = match &err {
                    AgentError::RateLimited { retry_after_secs } => *retry_after_secs,
                    _ => None,
                };
                let delay = policy.delay_for(attempt, retry_after);
                tracing::debug!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient agent failure, backing off"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(AgentError::Timeout),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    #[tokio::test]
    async fn succeeds_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let result = call_with_retry(&fast_policy(), &CancellationToken::new(), || {
            let calls = Arc::clone(&calls2);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AgentError>("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let result = call_with_retry(&fast_policy(), &CancellationToken::new(), || {
            let calls = Arc::clone(&calls2);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(AgentError::Transient("503".to_string()))
                } else {
                    Ok("recovered")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_short_circuit() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let result: Result<(), _> =
            call_with_retry(&fast_policy(), &CancellationToken::new(), || {
                let calls = Arc::clone(&calls2);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(AgentError::Fatal("invalid api key".to_string()))
                }
            })
            .await;
        assert!(matches!(result.unwrap_err(), AgentError::Fatal(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let result: Result<(), _> =
            call_with_retry(&fast_policy(), &CancellationToken::new(), || {
                let calls = Arc::clone(&calls2);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(AgentError::Transient("flaky".to_string()))
                }
            })
            .await;
        assert!(matches!(result.unwrap_err(), AgentError::Transient(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> = call_with_retry(&fast_policy(), &cancel, || async {
            panic!("must not be called after cancellation")
        })
        .await;
        assert!(matches!(result.unwrap_err(), AgentError::Timeout));
    }

    #[test]
    fn retry_after_overrides_backoff() {
        let policy = fast_policy();
        let delay = policy.delay_for(1, Some(7));
        assert_eq!(delay, Duration::from_secs(7));
    }
}
