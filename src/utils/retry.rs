//! Transport-level retry for outbound HTTP requests

use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

/// Statuses treated as transient server-side failures
const RETRYABLE_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Bounded retry with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_attempts: usize,
    /// Delay before the first retry; doubles on each following one
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retry_attempts: usize, base_delay: Duration) -> Self {
        Self {
            retry_attempts,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Send a request, retrying transient failures.
///
/// `make_request` is called once per attempt because a `RequestBuilder` is
/// consumed by `send`. After the last retry the final response is returned
/// as-is, even if it still carries a server error status.
pub async fn send_with_retry<F>(
    policy: &RetryPolicy,
    label: &str,
    make_request: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;

    loop {
        match make_request().send().await {
            Ok(response)
                if is_retryable_status(response.status()) && attempt < policy.retry_attempts =>
            {
                warn!(
                    target_label = %label,
                    status = %response.status(),
                    attempt = attempt + 1,
                    "Server error, retrying"
                );
            }
            Ok(response) => return Ok(response),
            Err(e) if is_transient(&e) && attempt < policy.retry_attempts => {
                warn!(target_label = %label, attempt = attempt + 1, error = %e, "Request failed, retrying");
            }
            Err(e) => {
                error!(
                    target_label = %label,
                    attempts = attempt + 1,
                    error = %e,
                    "Request failed"
                );
                return Err(e);
            }
        }

        sleep(policy.delay_for(attempt)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
    }
}
