//! Ambient engine-local configuration: HTTP timeout default, retry/backoff
//! knobs, the reconciler's fixed requeue interval, and dev filters. Not to
//! be confused with the external `SyncConfig` object — this is the
//! engine's own knob set.

use std::time::Duration;

use crate::devfilter::DevFilters;

/// Retry policy for paginated page fetches — the one place this engine
/// retries *within* a run. Whole-target write failures are never retried
/// within a run; they retry only via the next reconciliation tick.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_base: 2.0,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = self.base_delay.as_secs_f64() * self.exponential_base.powi(attempt as i32 - 1);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Retry a fallible async operation under `policy`, retrying only when
/// `is_retryable` returns true for the error. Used by concrete source/
/// target providers wrapping a single page fetch or write call; the
/// orchestrator itself never retries within a run.
pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy, is_retryable: impl Fn(&E) -> bool, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for attempt in 0..=policy.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }
                last_err = Some(e);
                if attempt < policy.max_retries {
                    tokio::time::sleep(policy.delay_for_attempt(attempt + 1)).await;
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub http_timeout: Duration,
    pub requeue_interval: Duration,
    pub retry: RetryPolicy,
    pub dev_filters: DevFilters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            requeue_interval: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            dev_filters: DevFilters::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryPolicy::default()
        };
        let result: Result<i32, &str> = retry_async(&policy, |_| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err("not yet") } else { Ok(42) } }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, &str> = retry_async(&RetryPolicy::default(), |_| false, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("fatal") }
        })
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
