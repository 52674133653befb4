// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Caller-side retry with exponential backoff
//!
//! Core components never retry unavailability themselves. Callers that want
//! to buffer-and-retry wrap their [`Learner`] in a [`RetryingLearner`]. Only
//! errors for which [`CortexError::is_retryable`] holds are retried.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::config::RetryConfig;
use crate::domain::{CortexError, TaskResult};

use super::learning_service::{LearnOutcome, Learner};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff,
            multiplier: config.multiplier,
            max_backoff: config.max_backoff,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

pub struct RetryingLearner<L: Learner> {
    inner: L,
    policy: RetryPolicy,
}

impl<L: Learner> RetryingLearner<L> {
    pub fn new(inner: L, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<L: Learner> Learner for RetryingLearner<L> {
    async fn learn_from_result_with_cancel(
        &self,
        result: &TaskResult,
        cancel: &CancellationToken,
    ) -> Result<LearnOutcome, CortexError> {
        let mut attempt = 1;
        loop {
            match self.inner.learn_from_result_with_cancel(result, cancel).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    metrics::counter!("pmem_learn_retries_total", "kind" => e.kind()).increment(1);
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Learning failed, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(CortexError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
