//! Generic exponential-backoff retry loop.
//!
//! Split out from the HTTP wrapper so the attempt/backoff arithmetic can be
//! tested deterministically with tokio's virtual clock, independent of any
//! live socket.

use std::future::Future;
use std::time::Duration;

/// Attempt budget and timing for one class of outbound call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts allowed (numbering starts at 1).
    pub attempts: u32,
    /// Base delay fed into the exponential backoff.
    pub base_delay: Duration,
    /// Per-attempt timeout; exceeding it aborts the in-flight call and
    /// counts as a transient failure.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Build a policy. `attempts` of zero is clamped to one.
    pub const fn new(attempts: u32, base_delay: Duration, timeout: Duration) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
            base_delay,
            timeout,
        }
    }
}

/// Why a retried operation ultimately failed.
#[derive(Debug)]
pub enum RetryError<E> {
    /// All allowed attempts failed with transient errors.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last: E,
    },
    /// A terminal (non-retryable) error ended the loop early.
    Terminal {
        /// The attempt on which the terminal error occurred.
        attempt: u32,
        /// The error itself.
        error: E,
    },
}

/// Backoff delay before the given attempt: `base_delay * 2^(attempt - 1)`.
///
/// Attempt 1 carries no delay (it runs immediately); the wait before
/// attempt 3 is therefore `base_delay * 4`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    policy.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Run `op` up to `policy.attempts` times.
///
/// `op` receives the 1-based attempt number. After a transient failure
/// that is not the last allowed attempt, waits [`backoff_delay`] for the
/// upcoming attempt and tries again; each retry is logged with the target
/// and attempt count. Terminal failures and exhaustion propagate the last
/// error -- nothing is swallowed.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    target: &str,
    mut op: F,
    is_transient: impl Fn(&E) -> bool,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !is_transient(&error) => {
                return Err(RetryError::Terminal { attempt, error });
            }
            Err(error) if attempt >= policy.attempts => {
                tracing::error!(
                    target_host = target,
                    attempts = attempt,
                    error = %error,
                    "Giving up after exhausting retry budget"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }
            Err(error) => {
                attempt += 1;
                let delay = backoff_delay(policy, attempt);
                tracing::warn!(
                    target_host = target,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient failure, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
