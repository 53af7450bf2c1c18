//! Conflict-aware retries
//!
//! [`ConflictRetryExecutor`] re-runs a whole read-compute-write closure when
//! the write is rejected as stale. Every attempt starts from fresh reads, so
//! a retried write never carries a decision computed from the rejected
//! snapshot.

use nncp_store::StoreError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{Instrument, Span};

/// Classifies errors as optimistic-concurrency conflicts
pub trait Conflict {
    /// Check if the error means the stored version changed since the read
    fn is_conflict(&self) -> bool;
}

impl Conflict for StoreError {
    fn is_conflict(&self) -> bool {
        StoreError::is_conflict(self)
    }
}

/// Growth of the delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay every time
    Fixed,
    /// `initial * (retry + 1)`
    Linear,
    /// `initial * 2^retry`
    #[default]
    Exponential,
}

/// Bounded backoff policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 behaves as 1
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Delay growth
    pub strategy: BackoffStrategy,
    /// Extra random delay, as a fraction of the computed delay
    pub jitter: f64,
}

impl RetryPolicy {
    /// Create policy without jitter
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay_ms: u64, strategy: BackoffStrategy) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            strategy,
            jitter: 0.0,
        }
    }

    /// With jitter fraction
    #[inline]
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Attempts actually performed
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (0 is the first retry), without jitter
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.delay_ms(retry))
    }

    /// Delay before retry number `retry`, plus up to `jitter * delay`
    #[must_use]
    pub fn jittered_delay(&self, retry: u32) -> Duration {
        let base = self.delay_ms(retry);
        if self.jitter <= 0.0 {
            return Duration::from_millis(base);
        }
        let factor = rand::rng().random::<f64>() * self.jitter;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let extra = (base as f64 * factor) as u64;
        Duration::from_millis(base.saturating_add(extra))
    }

    fn delay_ms(&self, retry: u32) -> u64 {
        match self.strategy {
            BackoffStrategy::Fixed => self.initial_delay_ms,
            BackoffStrategy::Linear => self
                .initial_delay_ms
                .saturating_mul(u64::from(retry) + 1),
            BackoffStrategy::Exponential => self
                .initial_delay_ms
                .saturating_mul(2u64.saturating_pow(retry)),
        }
    }
}

impl Default for RetryPolicy {
    /// 5 attempts, 10ms initial delay, exponential, 10% jitter
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 10,
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }
}

/// Runs work closures, retrying from scratch on conflicts
#[derive(Debug, Clone, Default)]
pub struct ConflictRetryExecutor {
    policy: RetryPolicy,
}

impl ConflictRetryExecutor {
    /// Create executor with a policy
    #[inline]
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Retry policy in use
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `work` until it succeeds, fails with a non-conflict, or attempts run out
    ///
    /// Each attempt runs inside `span`. `is_conflict` decides which errors are
    /// retried; any other error is returned at once. When attempts run out the
    /// last conflict is returned.
    ///
    /// # Errors
    /// Returns the error of the final attempt
    pub async fn execute_with<T, E, F, Fut, C>(
        &self,
        span: &Span,
        is_conflict: C,
        mut work: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: Display,
    {
        let attempts = self.policy.attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match work().instrument(span.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !is_conflict(&err) {
                return Err(err);
            }
            if attempt >= attempts {
                span.in_scope(|| {
                    tracing::warn!(attempts, error = %err, "conflict retries exhausted");
                });
                return Err(err);
            }

            let delay = self.policy.jittered_delay(attempt - 1);
            span.in_scope(|| {
                tracing::debug!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "retrying after conflict"
                );
            });
            tokio::time::sleep(delay).await;
        }
    }

    /// [`execute_with`](Self::execute_with) classifying errors through [`Conflict`]
    ///
    /// # Errors
    /// Returns the error of the final attempt
    pub async fn execute<T, E, F, Fut>(&self, span: &Span, work: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Conflict + Display,
    {
        self.execute_with(span, E::is_conflict, work).await
    }
}
