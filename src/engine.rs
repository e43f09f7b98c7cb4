//! Multi-strategy execution engine
//!
//! Runs an ordered list of independent fallback strategies for a named
//! operation, stopping at the first success. The engine only sequences and
//! logs; strategies own their side effects. It never retries a failed full
//! pass itself — callers wrap a whole invocation in [`with_retry`] when they
//! want bounded retry with backoff.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;

use crate::{Error, Result};

/// One self-contained attempt at an operation
pub struct Strategy<'a, T> {
    /// Stable name used in logs and aggregated failure causes
    pub name: &'static str,
    future: BoxFuture<'a, Result<T>>,
}

impl<'a, T> Strategy<'a, T> {
    /// Box a future as a named strategy
    pub fn new<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'a,
    {
        Self {
            name,
            future: Box::pin(future),
        }
    }
}

/// Options for a single engine invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Deadline for the whole invocation, not per strategy
    pub timeout: Option<Duration>,
}

/// How retry delays grow between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles after every failed attempt
    Exponential,
}

/// Bounded retry policy applied by a caller around a whole engine invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Delay growth mode
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before retry number `retry` (zero-based)
    #[must_use]
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => self.base_delay.saturating_mul(2u32.saturating_pow(retry)),
        }
    }
}

/// Transient record of one strategy attempt, used only for logging
struct Attempt {
    index: usize,
    name: &'static str,
    started: Instant,
}

impl Attempt {
    fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

/// Run `strategies` in order until one succeeds.
///
/// The first success short-circuits the rest. `options.timeout` bounds the
/// whole invocation; it does not cancel work a strategy has already issued,
/// it abandons the wait.
///
/// # Errors
///
/// Returns [`Error::AllStrategiesFailed`] with the per-strategy causes when
/// every strategy fails, or [`Error::Timeout`] when the overall deadline
/// expires first.
pub async fn run<T>(
    operation: &str,
    strategies: Vec<Strategy<'_, T>>,
    options: RunOptions,
) -> Result<T> {
    match options.timeout {
        None => run_ordered(operation, strategies).await,
        Some(timeout) => tokio::time::timeout(timeout, run_ordered(operation, strategies))
            .await
            .map_err(|_| {
                tracing::warn!(operation, timeout_ms = timeout.as_millis(), "operation timed out");
                Error::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
            })?,
    }
}

async fn run_ordered<T>(operation: &str, strategies: Vec<Strategy<'_, T>>) -> Result<T> {
    let total = strategies.len();
    let mut causes: Vec<(&'static str, Error)> = Vec::new();

    for (index, strategy) in strategies.into_iter().enumerate() {
        let attempt = Attempt {
            index,
            name: strategy.name,
            started: Instant::now(),
        };
        tracing::trace!(
            operation,
            strategy = attempt.name,
            attempt = attempt.index + 1,
            total,
            "attempting strategy"
        );

        match strategy.future.await {
            Ok(value) => {
                tracing::info!(
                    operation,
                    strategy = attempt.name,
                    elapsed_ms = attempt.elapsed_ms(),
                    "strategy succeeded"
                );
                return Ok(value);
            }
            Err(cause) => {
                tracing::debug!(
                    operation,
                    strategy = attempt.name,
                    attempt = attempt.index + 1,
                    elapsed_ms = attempt.elapsed_ms(),
                    error = %cause,
                    "strategy failed"
                );
                causes.push((attempt.name, cause));
            }
        }
    }

    tracing::error!(operation, strategies = total, "all strategies failed");
    Err(Error::AllStrategiesFailed {
        operation: operation.to_string(),
        causes,
    })
}

/// Retry a whole operation with bounded backoff.
///
/// Calls `f` up to `policy.max_attempts` times, sleeping per the policy
/// between attempts. This is the one place retry lives; the engine itself
/// never re-runs a failed pass.
///
/// # Errors
///
/// Returns the last attempt's error once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(operation: &str, policy: RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = policy.delay_before_retry(attempt - 1);
            tracing::debug!(
                operation,
                attempt = attempt + 1,
                delay_ms = delay.as_millis(),
                "retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }

        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!(operation, attempt = attempt + 1, error = %e, "attempt failed");
                last_err = Some(e);
            }
        }
    }

    // attempts >= 1, so at least one error was recorded
    Err(last_err.unwrap_or_else(|| Error::Config(format!("{operation}: zero retry attempts"))))
}
