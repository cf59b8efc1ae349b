use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::AgendaError;

/// Exponential backoff for agenda page downloads.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(8))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff_base, backoff_max }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (1-based), capped at `backoff_max`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt - 1);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }
}

/// Run `operation` until it succeeds, fails permanently or runs out of attempts.
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, AgendaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgendaError>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let wait = policy.backoff(attempt);
            debug!(?wait, attempt, "retrying agenda request");
            sleep(wait).await;
        }
        match operation().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts() => {
                warn!(error = %e, attempt = attempt + 1, "agenda request failed");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
