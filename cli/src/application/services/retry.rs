//! Bounded retry with linear backoff, and deadline-bounded condition polling.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Retry budget where attempt `i` waits `i × unit` before running again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearBackoff {
    /// Additional attempts after the first failure.
    pub retries: u32,
    pub unit: Duration,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            retries: 4,
            unit: Duration::from_secs(1),
        }
    }
}

impl LinearBackoff {
    #[must_use]
    pub const fn new(retries: u32, unit: Duration) -> Self {
        Self { retries, unit }
    }

    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.unit * attempt
    }
}

/// Execute an async operation, retrying failures with linear backoff.
///
/// Returns the first success, or the last error once `backoff.retries`
/// additional attempts are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    backoff: &LinearBackoff,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut result = operation().await;
    for attempt in 1..=backoff.retries {
        let Err(e) = &result else {
            break;
        };
        let delay = backoff.delay_for(attempt);
        warn!(
            operation = %operation_name,
            attempt = attempt,
            error = %e,
            delay = ?delay,
            "Operation failed, retrying"
        );
        sleep(delay).await;
        result = operation().await;
    }
    if let Err(e) = &result {
        debug!(
            operation = %operation_name,
            error = %e,
            "Operation failed after max retries"
        );
    }
    result
}

/// Invoke `condition` until it returns true or `deadline` passes.
///
/// Sleeps `min(interval, remaining)` between attempts. A condition already
/// in flight when the deadline passes is allowed to finish.
pub async fn poll_until<F, Fut>(deadline: Instant, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    loop {
        if Instant::now() >= deadline {
            return false;
        }
        if condition().await {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        sleep(interval.min(remaining)).await;
    }
}
