// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Learning Service
//!
//! The single entry point for mission runners: classify a finished task,
//! record it, and link it to the pattern it remedies (or is remedied by).
//!
//! ```text
//! TaskResult ─► OutcomeClassifier ─► PatternStore.upsert ─► LinkManager.link (optional)
//! ```
//!
//! Linking is best-effort: the observation is already stored when a link
//! fails, so the failure is logged and reported as `linked_to = None`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::naming::counterpart_name;
use crate::domain::{Classification, CortexError, Outcome, TaskResult};

use super::classifier::OutcomeClassifier;
use super::link_manager::LinkManager;
use super::pattern_store::PatternStore;

/// Result of one `learn_from_result` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnOutcome {
    pub classification: Classification,
    /// False when the classification was below `min_confidence_to_store`
    pub stored: bool,
    pub pattern_name: String,
    /// Occurrences after the upsert, absent when not stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<u64>,
    /// The pattern on the other end of the link that was created or reinforced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_to: Option<String>,
}

/// Anything that can learn from a task result
#[async_trait]
pub trait Learner: Send + Sync {
    async fn learn_from_result_with_cancel(
        &self,
        result: &TaskResult,
        cancel: &CancellationToken,
    ) -> Result<LearnOutcome, CortexError>;

    async fn learn_from_result(&self, result: &TaskResult) -> Result<LearnOutcome, CortexError> {
        self.learn_from_result_with_cancel(result, &CancellationToken::new())
            .await
    }
}

#[async_trait]
impl<L: Learner + ?Sized> Learner for Arc<L> {
    async fn learn_from_result_with_cancel(
        &self,
        result: &TaskResult,
        cancel: &CancellationToken,
    ) -> Result<LearnOutcome, CortexError> {
        (**self).learn_from_result_with_cancel(result, cancel).await
    }
}

/// Knobs of the learning flow
#[derive(Debug, Clone)]
pub struct LearningOptions {
    pub auto_link: bool,
    pub min_confidence_to_store: f64,
}

impl Default for LearningOptions {
    fn default() -> Self {
        Self {
            auto_link: true,
            min_confidence_to_store: 0.0,
        }
    }
}

pub struct LearningService {
    classifier: Arc<OutcomeClassifier>,
    store: Arc<PatternStore>,
    links: Arc<LinkManager>,
    options: LearningOptions,
}

impl LearningService {
    pub fn new(
        classifier: Arc<OutcomeClassifier>,
        store: Arc<PatternStore>,
        links: Arc<LinkManager>,
        options: LearningOptions,
    ) -> Self {
        Self {
            classifier,
            store,
            links,
            options,
        }
    }

    /// Pick the link partner for a freshly stored pattern
    async fn link_partner(&self, result: &TaskResult, stored: &Classification) -> Option<String> {
        if let Some(explicit) = result.link_with() {
            return Some(explicit.to_string());
        }
        if !self.options.auto_link {
            return None;
        }

        let counterpart = counterpart_name(&stored.pattern_name)?;
        match self.store.get(&counterpart).await {
            Ok(_) => Some(counterpart),
            Err(CortexError::PatternNotFound(_)) => None,
            Err(e) => {
                warn!(pattern_name = %stored.pattern_name, error = %e, "Counterpart lookup failed, not linking");
                None
            }
        }
    }

    async fn link_with(&self, stored: &Classification, partner: &str) -> Option<String> {
        let (success, failure) = match stored.classification {
            Outcome::Success => (stored.pattern_name.as_str(), partner),
            Outcome::Failure => (partner, stored.pattern_name.as_str()),
        };

        match self.links.link_default(success, failure).await {
            Ok(link) => {
                debug!(source = %link.source, target = %link.target, strength = link.strength, "Linked observation");
                Some(partner.to_string())
            }
            Err(e) => {
                metrics::counter!("pmem_link_failures_total", "kind" => e.kind()).increment(1);
                warn!(
                    pattern_name = %stored.pattern_name,
                    partner,
                    error = %e,
                    "Pattern stored but linking failed"
                );
                None
            }
        }
    }
}

#[async_trait]
impl Learner for LearningService {
    async fn learn_from_result_with_cancel(
        &self,
        result: &TaskResult,
        cancel: &CancellationToken,
    ) -> Result<LearnOutcome, CortexError> {
        let classification = match self.classifier.classify_with_cancel(result, cancel).await {
            Ok(c) => c,
            Err(e) => {
                metrics::counter!("pmem_learn_total", "result" => e.kind()).increment(1);
                return Err(e);
            }
        };

        if classification.confidence < self.options.min_confidence_to_store {
            metrics::counter!("pmem_learn_total", "result" => "below_threshold").increment(1);
            info!(
                pattern_name = %classification.pattern_name,
                confidence = classification.confidence,
                min_confidence = self.options.min_confidence_to_store,
                "Classification below storage threshold, not recording"
            );
            return Ok(LearnOutcome {
                pattern_name: classification.pattern_name.clone(),
                classification,
                stored: false,
                occurrences: None,
                linked_to: None,
            });
        }

        let pattern = match self.store.upsert(&classification).await {
            Ok(p) => p,
            Err(e) => {
                metrics::counter!("pmem_learn_total", "result" => e.kind()).increment(1);
                return Err(e);
            }
        };

        let linked_to = match self.link_partner(result, &classification).await {
            Some(partner) => self.link_with(&classification, &partner).await,
            None => None,
        };

        metrics::counter!("pmem_learn_total", "result" => "stored").increment(1);
        info!(
            pattern_name = %pattern.name,
            classification = %pattern.classification,
            occurrences = pattern.occurrences,
            linked_to = ?linked_to,
            "Learned from task result"
        );

        Ok(LearnOutcome {
            pattern_name: pattern.name,
            classification,
            stored: true,
            occurrences: Some(pattern.occurrences),
            linked_to,
        })
    }
}
