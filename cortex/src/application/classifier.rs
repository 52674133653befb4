// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Outcome Classifier
//!
//! Turns a [`TaskResult`] into a named [`Classification`] by delegating the
//! labelling to an injected [`ClassificationStrategy`]. The classifier owns
//! everything around that call:
//!
//! - input validation (empty task, out-of-range score)
//! - the per-call timeout and caller cancellation
//! - validation of what the strategy returned
//! - deterministic pattern naming
//!
//! It never touches the store.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::naming::derive_scoped_pattern_name;
use crate::domain::{Classification, ClassificationStrategy, CortexError, RawClassification, TaskResult};

pub const DEFAULT_CLASSIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OutcomeClassifier {
    strategy: Arc<dyn ClassificationStrategy>,
    timeout: Duration,
}

impl OutcomeClassifier {
    pub fn new(strategy: Arc<dyn ClassificationStrategy>, timeout: Duration) -> Self {
        Self { strategy, timeout }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn classify(&self, result: &TaskResult) -> Result<Classification, CortexError> {
        self.classify_with_cancel(result, &CancellationToken::new()).await
    }

    pub async fn classify_with_cancel(
        &self,
        result: &TaskResult,
        cancel: &CancellationToken,
    ) -> Result<Classification, CortexError> {
        result.validate()?;

        let strategy = self.strategy.name();
        let started = Instant::now();

        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(strategy, "Classification cancelled by caller");
                metrics::counter!("pmem_classifications_total", "strategy" => strategy, "result" => "cancelled")
                    .increment(1);
                return Err(CortexError::Cancelled);
            }
            outcome = tokio::time::timeout(
                self.timeout,
                self.strategy.classify_raw(&result.task, &result.output, result.quality_score),
            ) => match outcome {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    warn!(strategy, error = %e, "Classification strategy failed");
                    metrics::counter!("pmem_classifications_total", "strategy" => strategy, "result" => "unavailable")
                        .increment(1);
                    return Err(e);
                }
                Err(_) => {
                    warn!(strategy, timeout = ?self.timeout, "Classification timed out");
                    metrics::counter!("pmem_classifications_total", "strategy" => strategy, "result" => "timeout")
                        .increment(1);
                    return Err(CortexError::ClassificationTimeout(self.timeout));
                }
            }
        };

        metrics::histogram!("pmem_classification_duration_seconds", "strategy" => strategy)
            .record(started.elapsed().as_secs_f64());

        let classification = Self::complete(raw, result)?;

        metrics::counter!(
            "pmem_classifications_total",
            "strategy" => strategy,
            "result" => classification.classification.name_prefix()
        )
        .increment(1);
        debug!(
            strategy,
            pattern_name = %classification.pattern_name,
            classification = %classification.classification,
            confidence = classification.confidence,
            "Classified task result"
        );

        Ok(classification)
    }

    /// Validate strategy output and attach the derived name and domain
    fn complete(raw: RawClassification, result: &TaskResult) -> Result<Classification, CortexError> {
        if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
            return Err(CortexError::ClassificationUnavailable(format!(
                "strategy returned confidence {} outside [0, 1]",
                raw.confidence
            )));
        }

        let summary = raw
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&result.task);

        let domain = result.domain();
        let mut classification = Classification::new(
            derive_scoped_pattern_name(raw.label, domain, summary),
            raw.label,
            raw.reason,
            raw.confidence,
        );
        if let Some(domain) = domain {
            classification = classification.with_domain(domain);
        }
        Ok(classification)
    }
}
