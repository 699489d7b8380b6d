//! Resilient outbound HTTP: per-attempt timeout, transient-failure
//! classification, and exponential-backoff retry over [`reqwest`].
//!
//! Every call to an external SaaS goes through [`send_with_retry`]. A
//! failure is either *transient* (DNS, connection reset, timeout,
//! unreachable host, aborted transfer) and retried, or *terminal* and
//! propagated immediately. Well-formed HTTP error responses are returned
//! as `Ok(response)` -- whether to treat a status code as a failure is the
//! caller's decision.

pub mod retry;

pub use retry::{retry_with_backoff, RetryError, RetryPolicy};

/// Error type for a retried HTTP call.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// Every allowed attempt failed with a transient error; carries the
    /// last one.
    #[error("request failed after {attempts} attempts: {source}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The failure observed on the final attempt.
        source: reqwest::Error,
    },

    /// A non-retryable failure (TLS, malformed request, redirect policy).
    #[error("request failed: {0}")]
    Terminal(#[from] reqwest::Error),
}

impl HttpClientError {
    /// How many attempts were made before this error was produced.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Terminal(_) => 1,
        }
    }
}

/// Classify a [`reqwest::Error`] as transient (retryable) or terminal.
///
/// Transient: timeouts, connect-level failures (DNS resolution, refused or
/// reset connections, unreachable networks), and mid-transfer request
/// failures. Terminal: request-builder errors, redirect-policy errors, and
/// anything else.
pub fn is_transient(error: &reqwest::Error) -> bool {
    if error.is_builder() || error.is_redirect() || error.is_status() {
        return false;
    }
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Send a request with the given retry policy.
///
/// `make_request` is invoked once per attempt so each attempt gets a fresh
/// request; the policy's per-attempt timeout is applied on top of whatever
/// the builder already carries. `target` is a short label (usually the
/// host) used only for retry logging.
pub async fn send_with_retry(
    policy: &RetryPolicy,
    target: &str,
    make_request: impl Fn() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response, HttpClientError> {
    let op = |_attempt: u32| {
        let request = make_request().timeout(policy.timeout);
        async move { request.send().await }
    };

    match retry_with_backoff(policy, target, op, is_transient).await {
        Ok(response) => Ok(response),
        Err(RetryError::Exhausted { attempts, last }) => Err(HttpClientError::Exhausted {
            attempts,
            source: last,
        }),
        Err(RetryError::Terminal { error, .. }) => Err(HttpClientError::Terminal(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn connection_refused_is_exhausted_after_retries() {
        // Nothing listens on this port; every attempt fails at connect time.
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_secs(1));
        let client = reqwest::Client::new();

        let err = send_with_retry(&policy, "localhost", || {
            client.get("http://127.0.0.1:1/unreachable")
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts(), 2);
        assert!(matches!(err, HttpClientError::Exhausted { .. }));
    }

    #[test]
    fn builder_errors_are_terminal() {
        let err = reqwest::Client::new().get("://not-a-url").build().unwrap_err();
        assert!(!is_transient(&err));
    }
}
