//! Poll loops and cancellation boundaries for blocking chain operations.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::SweepError;

/// Re-evaluates a chain predicate until it yields, the deadline passes, or the batch is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    timeout: Option<Duration>,
}

impl Poller {
    /// `timeout: None` polls until cancelled.
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Poll `check` until it returns `Ok(Some(_))`.
    ///
    /// An `Err` from `check` ends the wait immediately. Running out of time
    /// yields [`SweepError::Timeout`] naming `what`; cancellation yields
    /// [`SweepError::Cancelled`].
    pub async fn wait_for<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        what: &str,
        mut check: F,
    ) -> Result<T, SweepError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, SweepError>>,
    {
        // A timeout too large to represent as an instant never expires.
        let deadline = self
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            if let Some(value) = cancellable(cancel, check()).await? {
                return Ok(value);
            }
            trace!(what, attempt, "condition not met yet");

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(SweepError::Timeout(what.to_string()));
                    }
                    self.interval.min(deadline - now)
                }
                None => self.interval,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SweepError::Cancelled),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

/// Run `fut` unless the batch is cancelled first.
pub async fn cancellable<T, Fut>(cancel: &CancellationToken, fut: Fut) -> Result<T, SweepError>
where
    Fut: Future<Output = Result<T, SweepError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SweepError::Cancelled),
        result = fut => result,
    }
}

/// Run `fut` with both a cancellation boundary and a hard time limit.
pub async fn bounded<T, Fut>(
    cancel: &CancellationToken,
    limit: Duration,
    what: &str,
    fut: Fut,
) -> Result<T, SweepError>
where
    Fut: Future<Output = Result<T, SweepError>>,
{
    match tokio::time::timeout(limit, cancellable(cancel, fut)).await {
        Ok(result) => result,
        Err(_) => Err(SweepError::Timeout(what.to_string())),
    }
}
