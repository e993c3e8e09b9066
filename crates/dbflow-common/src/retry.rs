//! Bounded fixed-interval retry and polling.
//!
//! Every wait in a workflow is an operation retried on a fixed interval up to
//! a fixed number of attempts. The wall-clock bound is `interval * max_attempts`;
//! there is no separate deadline. On exhaustion the error from the *last*
//! attempt is returned so the caller sees the most recent status.
//!
//! # Example
//!
//! ```ignore
//! use dbflow_common::retry::{retry_until_success, RetryConfig};
//!
//! retry_until_success(&RetryConfig::DATABASE_READY, "wait_database_ready", || async {
//!     check_database_ready(&store, &ns, &name).await
//! })
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Fixed-interval retry budget
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay between attempts
    pub interval: Duration,
    /// Maximum number of attempts (values below 1 are treated as 1)
    pub max_attempts: u32,
}

impl RetryConfig {
    /// Database record readiness: one minute apart, 80 attempts
    pub const DATABASE_READY: Self = Self::new(Duration::from_secs(60), 80);

    /// Verification workload start: one second apart, 300 attempts
    pub const WORKLOAD_RUNNING: Self = Self::new(Duration::from_secs(1), 300);

    /// Database record deletion confirmation: one minute apart, 10 attempts
    pub const DATABASE_DELETED: Self = Self::new(Duration::from_secs(60), 10);

    /// Create a config from an interval and attempt count
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Call `operation` until it succeeds or the attempt budget is spent.
///
/// Sleeps `config.interval` between attempts, never after the last one.
/// Returns the first success, or the error from the final attempt.
pub async fn retry_until_success<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = config.attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                debug!(operation = %operation_name, attempt, "Operation succeeded");
                return Ok(value);
            }
            Err(e) if attempt >= attempts => {
                warn!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    "Operation failed after max attempts"
                );
                return Err(e);
            }
            Err(e) => {
                debug!(
                    operation = %operation_name,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Operation not successful yet, retrying"
                );
                tokio::time::sleep(config.interval).await;
            }
        }
    }
}

/// Thread explicit state through a bounded poll.
///
/// `transition` takes the current state and returns the next state together
/// with the outcome of checking it. The loop stops on the first `Ok(())` or
/// after the last attempt, and always hands back the final state, so a caller
/// can inspect what was last observed even on failure.
pub async fn poll_transition<S, F, Fut, E>(
    config: &RetryConfig,
    operation_name: &str,
    state: S,
    transition: F,
) -> (S, Result<(), E>)
where
    F: FnMut(S) -> Fut,
    Fut: Future<Output = (S, Result<(), E>)>,
    E: std::fmt::Display,
{
    poll_transition_if(config, operation_name, state, |_| true, transition).await
}

/// Like [`poll_transition`], but stops early on an error `retryable` rejects.
pub async fn poll_transition_if<S, F, Fut, E, R>(
    config: &RetryConfig,
    operation_name: &str,
    mut state: S,
    retryable: R,
    mut transition: F,
) -> (S, Result<(), E>)
where
    F: FnMut(S) -> Fut,
    Fut: Future<Output = (S, Result<(), E>)>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let attempts = config.attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let (next, outcome) = transition(state).await;
        state = next;

        match outcome {
            Ok(()) => {
                debug!(operation = %operation_name, attempt, "Poll reached target state");
                return (state, Ok(()));
            }
            Err(e) if !retryable(&e) => {
                warn!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    "Poll hit a non-retryable error"
                );
                return (state, Err(e));
            }
            Err(e) if attempt >= attempts => {
                warn!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    "Poll exhausted its attempts"
                );
                return (state, Err(e));
            }
            Err(e) => {
                debug!(
                    operation = %operation_name,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Target state not reached yet"
                );
                tokio::time::sleep(config.interval).await;
            }
        }
    }
}
