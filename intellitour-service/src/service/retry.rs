//! Bounded exponential backoff for rate-limited assistant calls.

use std::future::Future;

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::AssistantError;

/// Run `call` until it succeeds, fails with a non-rate-limit error, or
/// `max_attempts` calls have been made. The n-th retry waits
/// `base_delay * 2^(n-1)`.
pub(crate) async fn with_backoff<T, F, Fut>(
    policy: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T, AssistantError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AssistantError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limit() && attempt + 1 < max_attempts => {
                let delay = policy.base_delay() * 2u32.saturating_pow(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
