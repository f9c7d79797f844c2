use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use crate::BackoffPolicy;
use crate::CommandError;
use crate::DispatchError;
use crate::JobPollError;

/// Error types that can drive [`task_with_timeout_and_exponential_backoff`]
pub(crate) trait Retryable: Sized {
    fn is_retryable(&self) -> bool;

    fn attempt_timed_out(timeout: Duration) -> Self;

    fn exhausted(
        attempts: usize,
        last: Self,
    ) -> Self;
}

/// Runs `task` until it succeeds, fails permanently, or the policy is exhausted.
///
/// Each attempt is bounded by `policy.timeout_ms`. Retryable failures sleep
/// `base_delay_ms`, doubling up to `max_delay_ms`, before the next attempt.
/// Non-retryable failures are returned as-is without another attempt.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P, E>(
    mut task: F,
    policy: BackoffPolicy,
) -> std::result::Result<P, E>
where
    F: FnMut() -> T,
    T: Future<Output = std::result::Result<P, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_retries = policy.max_retries.max(1);
    let timeout_duration = policy.timeout();
    let mut retries = 0;

    loop {
        debug!("Attempt {} of {}", retries + 1, max_retries);
        let error = match timeout(timeout_duration, task()).await {
            Ok(Ok(r)) => return Ok(r),
            Ok(Err(error)) => error,
            Err(_elapsed) => {
                warn!("Task timed out after {:?}", timeout_duration);
                E::attempt_timed_out(timeout_duration)
            }
        };

        if !error.is_retryable() {
            return Err(error);
        }

        retries += 1;
        if retries >= max_retries {
            warn!("Task failed after {} attempts: {}", retries, error);
            return Err(E::exhausted(retries, error));
        }

        let delay = policy.delay_for(retries - 1);
        warn!("Attempt {} failed: {}. Retrying in {:?}", retries, error, delay);
        sleep(delay).await;
    }
}

impl Retryable for JobPollError {
    fn is_retryable(&self) -> bool {
        JobPollError::is_retryable(self)
    }

    fn attempt_timed_out(timeout: Duration) -> Self {
        JobPollError::AttemptTimeout(timeout)
    }

    fn exhausted(
        attempts: usize,
        last: Self,
    ) -> Self {
        JobPollError::Exhausted {
            attempts,
            last: Box::new(last),
        }
    }
}

impl Retryable for DispatchError {
    fn is_retryable(&self) -> bool {
        DispatchError::is_retryable(self)
    }

    fn attempt_timed_out(timeout: Duration) -> Self {
        DispatchError::Timeout(timeout)
    }

    fn exhausted(
        attempts: usize,
        last: Self,
    ) -> Self {
        DispatchError::Exhausted {
            attempts,
            last: Box::new(last),
        }
    }
}

impl Retryable for CommandError {
    fn is_retryable(&self) -> bool {
        CommandError::is_retryable(self)
    }

    fn attempt_timed_out(timeout: Duration) -> Self {
        CommandError::Timeout(timeout)
    }

    fn exhausted(
        attempts: usize,
        last: Self,
    ) -> Self {
        CommandError::Exhausted {
            attempts,
            last: Box::new(last),
        }
    }
}
