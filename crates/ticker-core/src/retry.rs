//! Bounded retry for transient upstream failures.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles after every retry, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

/// Retry policy shared by page fetches and metadata fetches.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff,
        }
    }

    /// Policy for paginated listing requests: 5 attempts, 5 s apart.
    pub fn pages() -> Self {
        Self::new(5, Duration::from_secs(5), Backoff::Fixed)
    }

    /// Policy for issuer metadata documents.
    pub fn metadata() -> Self {
        Self::new(
            3,
            Duration::from_secs(1),
            Backoff::Exponential {
                max_delay: Duration::from_secs(4),
            },
        )
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Backoff::Fixed)
    }

    fn next_delay(&self, retry: usize) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let factor = 2_u32.saturating_pow(retry as u32);
                self.delay.saturating_mul(factor).min(max_delay)
            }
        }
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or the
    /// attempt budget is spent. The last error is returned on exhaustion.
    pub async fn retry_async<F, Fut, T, E, P>(&self, is_retryable: P, mut op: F) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts || !is_retryable(&err) {
                        return Err(err);
                    }
                    let delay = self.next_delay(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after transient failure"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::pages()
    }
}
