use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::error::GpError;

/// Default attempt budget for [`retry`].
pub const DEFAULT_ATTEMPTS: u32 = 10;

const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);
const BACKOFF_STEP: Duration = Duration::from_millis(500);

/// Bound `fut` by a single timer.
///
/// If the timer fires first the future is dropped and [`GpError::Timeout`] is
/// returned; settlement is exactly-once because the losing branch never runs
/// again. A timed-out caller is responsible for its own cleanup (listener
/// removal, stopping a scan) after this returns.
pub async fn deadline<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, GpError>>,
) -> Result<T, GpError> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(GpError::Timeout),
    }
}

/// Progress notifications emitted by [`retry`] so the caller can render and
/// clear a transient single-line status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    /// An attempt failed and a backoff sleep is about to start.
    Failed { attempt: u32, max_attempts: u32 },
    /// The operation settled (success after failures, or budget exhausted);
    /// any transient status should be cleared.
    Settled,
}

/// Run `op` until it succeeds or `max_attempts` consecutive failures occur.
///
/// The first attempt runs immediately. The backoff is linear: 1000 ms after
/// the first failure, growing by 500 ms per subsequent failure. After the
/// budget is exhausted the last error is returned unchanged.
pub async fn retry<T, E, F, Fut, N>(mut op: F, max_attempts: u32, mut notify: N) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    N: FnMut(RetryEvent),
{
    let mut delay = INITIAL_BACKOFF;
    let mut failures = 0u32;
    loop {
        match op().await {
            Ok(value) => {
                if failures > 0 {
                    notify(RetryEvent::Settled);
                }
                return Ok(value);
            }
            Err(err) => {
                failures += 1;
                if failures >= max_attempts {
                    notify(RetryEvent::Settled);
                    return Err(err);
                }
                debug!(attempt = failures, max_attempts, "attempt failed, backing off");
                notify(RetryEvent::Failed {
                    attempt: failures,
                    max_attempts,
                });
                sleep(delay).await;
                delay += BACKOFF_STEP;
            }
        }
    }
}
