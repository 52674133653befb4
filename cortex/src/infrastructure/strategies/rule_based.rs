// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Threshold classifier used when no model backend is configured

use async_trait::async_trait;

use crate::domain::{ClassificationStrategy, CortexError, Outcome, RawClassification};

pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// `quality_score >= threshold` is SUCCESS.
///
/// Confidence is 0.5 right at the threshold and grows linearly to 1.0 at the
/// far end of the score range on either side.
#[derive(Debug, Clone)]
pub struct RuleBasedStrategy {
    threshold: f64,
}

impl RuleBasedStrategy {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn confidence(&self, label: Outcome, score: f64) -> f64 {
        let (distance, span) = match label {
            Outcome::Success => (score - self.threshold, 1.0 - self.threshold),
            Outcome::Failure => (self.threshold - score, self.threshold),
        };
        if span <= f64::EPSILON {
            return 1.0;
        }
        (0.5 + 0.5 * (distance / span)).clamp(0.5, 1.0)
    }
}

impl Default for RuleBasedStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

#[async_trait]
impl ClassificationStrategy for RuleBasedStrategy {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    async fn classify_raw(
        &self,
        _task: &str,
        _output: &str,
        quality_score: f64,
    ) -> Result<RawClassification, CortexError> {
        let label = if quality_score >= self.threshold {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        let comparison = match label {
            Outcome::Success => ">=",
            Outcome::Failure => "<",
        };

        Ok(RawClassification {
            label,
            reason: format!(
                "quality score {:.2} {} threshold {:.2}",
                quality_score, comparison, self.threshold
            ),
            confidence: self.confidence(label, quality_score),
            summary: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_threshold_boundary_is_success() {
        let strategy = RuleBasedStrategy::default();
        let raw = strategy.classify_raw("t", "", 0.6).await.unwrap();
        assert_eq!(raw.label, Outcome::Success);
        assert!((raw.confidence - 0.5).abs() < 1e-9);
        assert_eq!(raw.reason, "quality score 0.60 >= threshold 0.60");
    }

    #[tokio::test]
    async fn test_confidence_grows_with_distance() {
        let strategy = RuleBasedStrategy::default();

        let perfect = strategy.classify_raw("t", "", 1.0).await.unwrap();
        assert_eq!(perfect.label, Outcome::Success);
        assert!((perfect.confidence - 1.0).abs() < 1e-9);

        let zero = strategy.classify_raw("t", "", 0.0).await.unwrap();
        assert_eq!(zero.label, Outcome::Failure);
        assert!((zero.confidence - 1.0).abs() < 1e-9);

        let mid = strategy.classify_raw("t", "", 0.3).await.unwrap();
        assert_eq!(mid.label, Outcome::Failure);
        assert!((mid.confidence - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_degenerate_thresholds() {
        let everything_succeeds = RuleBasedStrategy::new(0.0);
        let raw = everything_succeeds.classify_raw("t", "", 0.0).await.unwrap();
        assert_eq!(raw.label, Outcome::Success);

        let nothing_succeeds = RuleBasedStrategy::new(1.0);
        let raw = nothing_succeeds.classify_raw("t", "", 0.99).await.unwrap();
        assert_eq!(raw.label, Outcome::Failure);
        let raw = nothing_succeeds.classify_raw("t", "", 1.0).await.unwrap();
        assert_eq!(raw.confidence, 1.0);
    }
}
