use std::future::Future;
use std::time::Duration;

use promptcraft_core::PromptcraftError;

/// Retry budget for provider calls. The default matches the production
/// policy: three attempts total, exponential backoff of 2s then 4s.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after the given attempt: `base_delay * 2^attempt`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Runs `op` until it succeeds, a deterministic error occurs, or the attempt
/// budget is exhausted. Only transient errors (provider status, transport)
/// are retried. The inter-attempt wait is a plain timed suspension holding no
/// locks; dropping the returned future cancels a pending backoff.
///
/// When the budget runs out the last transient error is wrapped in
/// [`PromptcraftError::CallFailed`]. No wait happens after the final attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, PromptcraftError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PromptcraftError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < max_attempts => {
                let wait = policy.backoff(attempt);
                tracing::warn!(
                    attempt,
                    wait_secs = wait.as_secs_f64(),
                    error = %error,
                    "transient provider failure, backing off"
                );
                tokio::time::sleep(wait).await;
            }
            Err(error) if error.is_transient() => {
                tracing::error!(
                    attempts = attempt,
                    error = %error,
                    "provider call failed on final attempt"
                );
                return Err(PromptcraftError::CallFailed {
                    attempts: attempt,
                    source: Box::new(error),
                });
            }
            Err(error) => return Err(error),
        }
    }
}
