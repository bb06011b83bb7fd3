//! Retry logic with linear backoff
//!
//! Every remote operation in the pipeline (metadata lookup, fetch, upload)
//! goes through [`execute`]. Transient failures are retried with a linear
//! backoff (`backoff_unit * attempt_number`); rate-limit failures instead
//! wait the server-specified delay but count against the same attempt
//! budget. Linear rather than exponential backoff is deliberate: the
//! external rate limiter announces its own delays, so predictability beats
//! aggressive growth here.
//!
//! # Example
//!
//! ```no_run
//! use sticker_dl::retry::{RetryPolicy, execute};
//! use sticker_dl::error::Error;
//!
//! # async fn example() -> Result<(), Error> {
//! let policy = RetryPolicy::default();
//! let value = execute(&policy, || async {
//!     // Your remote operation here
//!     Ok::<_, Error>(42)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Attempt budget and backoff unit for one retried operation
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total number of attempts (not retries) before giving up
    pub max_attempts: u32,
    /// Backoff unit: attempt `n` waits `backoff_unit * n` before attempt `n+1`
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().policy()
    }
}

impl RetryConfig {
    /// Policy for remote fetch/metadata operations
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_unit: self.backoff_unit,
        }
    }

    /// Policy for uploads (direct or per chunk)
    pub fn upload_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upload_attempts,
            backoff_unit: self.backoff_unit,
        }
    }
}

/// Execute an async operation with bounded retries and linear backoff
///
/// # Arguments
///
/// * `policy` - Attempt budget and backoff unit
/// * `operation` - Async closure returning `Result<T>`; must be safe to
///   repeat (idempotent or resumable), since partial completion is not
///   rolled back between attempts
///
/// # Returns
///
/// The first successful result, or:
/// - the error itself, immediately, when it is not transient;
/// - [`Error::ExhaustedRetries`] wrapping the last error once every attempt
///   of the budget has failed with a transient error.
///
/// The delay before attempt `n+1` is the failure's `retry_after` when it
/// carries one (rate limit), else `backoff_unit * n`.
pub async fn execute<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = e
                    .retry_after()
                    .unwrap_or_else(|| policy.backoff_unit * attempt);
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_transient() => {
                tracing::error!(
                    error = %e,
                    attempts = attempt,
                    "operation failed after all retry attempts exhausted"
                );
                return Err(Error::ExhaustedRetries {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "operation failed with non-transient error");
                return Err(e);
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_unit: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn success_invokes_exactly_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = execute(&quick_policy(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn transient_failures_then_success_invokes_k_plus_one_times() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = execute(&quick_policy(3), || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(Error::Timeout("fetch".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "2 transient failures then success = 3 invocations"
        );
    }

    #[tokio::test]
    async fn exhaustion_invokes_exactly_max_attempts_times() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = execute(&quick_policy(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::Transport("connection reset".into()))
            }
        })
        .await;

        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "max_attempts bounds total invocations, with no further attempts"
        );
        match result {
            Err(Error::ExhaustedRetries { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, Error::Transport(_)));
            }
            other => panic!("expected ExhaustedRetries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_transient_error_propagates_without_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = execute(&quick_policy(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::UnsupportedFormat("bmp".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "permanent errors must not be retried"
        );
    }

    #[tokio::test]
    async fn backoff_is_linear_in_attempt_number() {
        let timestamps = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let ts_clone = timestamps.clone();

        let _result = execute(&quick_policy(3), || {
            let ts = ts_clone.clone();
            async move {
                ts.lock().await.push(std::time::Instant::now());
                Err::<i32, _>(Error::Timeout("fetch".into()))
            }
        })
        .await;

        let ts = timestamps.lock().await;
        assert_eq!(ts.len(), 3, "3 attempts = 3 invocations");

        // Delay after attempt 1 is ~10ms, after attempt 2 ~20ms
        let gap1 = ts[1].duration_since(ts[0]);
        let gap2 = ts[2].duration_since(ts[1]);
        assert!(
            gap1 >= Duration::from_millis(8),
            "first delay should be ~10ms, was {gap1:?}"
        );
        assert!(
            gap2 >= Duration::from_millis(16),
            "second delay should be ~20ms (unit * 2, not unit * 2^2), was {gap2:?}"
        );
        assert!(
            gap2 < Duration::from_millis(200),
            "linear backoff must not balloon, was {gap2:?}"
        );
    }

    #[tokio::test]
    async fn rate_limit_delay_overrides_backoff() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = std::time::Instant::now();

        let result = execute(&quick_policy(2), || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count == 0 {
                    Err(Error::RateLimited {
                        retry_after: Duration::from_millis(60),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(55),
            "should honor the server-specified delay, waited {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn rate_limits_count_against_the_same_budget() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = execute(&quick_policy(2), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::RateLimited {
                    retry_after: Duration::from_millis(5),
                })
            }
        })
        .await;

        assert_eq!(
            counter.load(Ordering::SeqCst),
            2,
            "rate-limited attempts consume the budget, no extra retry outside it"
        );
        assert!(matches!(result, Err(Error::ExhaustedRetries { attempts: 2, .. })));
    }

    #[tokio::test]
    async fn zero_max_attempts_still_runs_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = execute(&quick_policy(0), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::Timeout("fetch".into()))
            }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(Error::ExhaustedRetries { attempts: 1, .. })));
    }

    #[test]
    fn policies_come_from_retry_config() {
        let config = RetryConfig::default();
        let fetch = config.policy();
        let upload = config.upload_policy();
        assert_eq!(fetch.max_attempts, 3);
        assert_eq!(upload.max_attempts, 5);
        assert_eq!(fetch.backoff_unit, Duration::from_secs(1));
        assert_eq!(upload.backoff_unit, Duration::from_secs(1));
    }
}
