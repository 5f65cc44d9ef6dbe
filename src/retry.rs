use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::debug;

use crate::error::{CopyError, Result};

/// Strategy used by [`RetryExecutor`] to wait between attempts.
///
/// Receives the requested delay and returns how long it actually waited, which
/// is what the executor charges against its time ceiling.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn sleep(&self, requested: Duration) -> Duration;
}

/// Sleeps for the requested delay plus a random jitter in `[0, max_jitter)`.
#[derive(Debug, Clone)]
pub struct JitterBackoff {
    max_jitter: Duration,
}

impl JitterBackoff {
    pub fn new(max_jitter: Duration) -> Self {
        Self { max_jitter }
    }
}

#[async_trait]
impl Backoff for JitterBackoff {
    async fn sleep(&self, requested: Duration) -> Duration {
        let delay = requested + random_jitter(self.max_jitter);
        tokio::time::sleep(delay).await;
        delay
    }
}

fn random_jitter(max_jitter: Duration) -> Duration {
    let max_jitter_ms = max_jitter.as_millis() as u64;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_jitter_ms))
}

/// Result of a single attempt handed to [`RetryExecutor::run`].
#[derive(Debug, PartialEq, Eq)]
pub enum Attempt<T> {
    Done(T),
    Retry,
}

/// Bounded-time retry loop.
///
/// The operation is invoked with the attempt number and the time already spent
/// waiting. An `Err` aborts immediately, `Attempt::Done` finishes, and
/// `Attempt::Retry` backs off for `elapsed * attempt`, capped at the time left
/// before the ceiling (plus whatever the backoff strategy adds), before trying
/// again.
#[derive(Clone)]
pub struct RetryExecutor {
    backoff: Arc<dyn Backoff>,
    max_elapsed: Duration,
}

impl RetryExecutor {
    pub fn new(backoff: Arc<dyn Backoff>, max_elapsed: Duration) -> Self {
        Self {
            backoff,
            max_elapsed,
        }
    }

    pub fn max_elapsed(&self) -> Duration {
        self.max_elapsed
    }

    pub async fn run<T, F, Fut>(&self, table: &str, operation: F) -> Result<T>
    where
        F: FnMut(u32, Duration) -> Fut,
        Fut: Future<Output = Result<Attempt<T>>>,
    {
        self.run_from(table, Duration::ZERO, operation)
            .await
            .map(|(value, _)| value)
    }

    /// Like [`run`](Self::run), but starts the clock at `elapsed` so several
    /// runs can share one ceiling. Returns the value and the elapsed time at
    /// completion.
    pub async fn run_from<T, F, Fut>(
        &self,
        table: &str,
        elapsed: Duration,
        mut operation: F,
    ) -> Result<(T, Duration)>
    where
        F: FnMut(u32, Duration) -> Fut,
        Fut: Future<Output = Result<Attempt<T>>>,
    {
        let mut elapsed = elapsed;
        let mut attempt: u32 = 0;

        while elapsed < self.max_elapsed {
            if let Attempt::Done(value) = operation(attempt, elapsed).await? {
                return Ok((value, elapsed));
            }

            let requested = elapsed
                .saturating_mul(attempt)
                .min(self.max_elapsed.saturating_sub(elapsed));
            let slept = self.backoff.sleep(requested).await;
            debug!(
                "{table}: attempt {attempt} not done, slept {} ms",
                slept.as_millis()
            );
            elapsed += slept;
            attempt += 1;
        }

        Err(self.timeout(table, elapsed))
    }

    pub(crate) fn timeout(&self, table: &str, elapsed: Duration) -> CopyError {
        CopyError::Timeout {
            table: table.to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
            max_elapsed_ms: self.max_elapsed.as_millis() as u64,
        }
    }
}
