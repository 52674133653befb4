// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Pattern Store
//!
//! Idempotent-by-name upsert of classified observations.
//!
//! A repeat observation of an existing name increments `occurrences`, bumps
//! `last_seen`, replaces `reason` and merges `confidence` through the
//! configured [`ConfidencePolicy`]. The stored classification never changes:
//! an observation with the opposite label fails with
//! [`CortexError::ClassificationConflict`].
//!
//! Upserts on one name are serialised by the shared [`KeyedLocks`]; revision
//! conflicts from other processes are re-read and re-applied a bounded number
//! of times. Unavailability is never retried here.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::EventBus;
use crate::domain::repository::PatternRepository;
use crate::domain::{Classification, ConfidencePolicy, CortexError, CortexEvent, Pattern, StoreError};
use crate::infrastructure::KeyedLocks;

/// Attempts before a persistent revision conflict is reported as unavailability
pub const MAX_CONFLICT_ATTEMPTS: usize = 3;

enum Attempt {
    Done(Pattern, CortexEvent),
    Conflict(String),
}

pub struct PatternStore {
    repository: Arc<dyn PatternRepository>,
    locks: Arc<KeyedLocks>,
    event_bus: Arc<dyn EventBus>,
    policy: ConfidencePolicy,
}

impl PatternStore {
    pub fn new(
        repository: Arc<dyn PatternRepository>,
        locks: Arc<KeyedLocks>,
        event_bus: Arc<dyn EventBus>,
        policy: ConfidencePolicy,
    ) -> Self {
        Self {
            repository,
            locks,
            event_bus,
            policy,
        }
    }

    pub fn policy(&self) -> ConfidencePolicy {
        self.policy
    }

    pub async fn upsert(&self, classification: &Classification) -> Result<Pattern, CortexError> {
        self.upsert_at(classification, Utc::now()).await
    }

    /// Upsert with an explicit observation time
    pub async fn upsert_at(
        &self,
        classification: &Classification,
        observed_at: DateTime<Utc>,
    ) -> Result<Pattern, CortexError> {
        validate(classification)?;
        let name = classification.pattern_name.as_str();

        let _guard = self.locks.lock(name).await;

        for attempt in 1..=MAX_CONFLICT_ATTEMPTS {
            match self.try_upsert(classification, observed_at).await? {
                Attempt::Done(pattern, event) => {
                    self.event_bus.publish(event);
                    return Ok(pattern);
                }
                Attempt::Conflict(detail) => {
                    metrics::counter!("pmem_store_conflicts_total").increment(1);
                    warn!(pattern_name = name, attempt, %detail, "Revision conflict on upsert, re-reading");
                }
            }
        }

        Err(CortexError::StoreUnavailable(format!(
            "pattern '{}' kept changing concurrently after {} attempts",
            name, MAX_CONFLICT_ATTEMPTS
        )))
    }

    async fn try_upsert(
        &self,
        classification: &Classification,
        observed_at: DateTime<Utc>,
    ) -> Result<Attempt, CortexError> {
        let name = &classification.pattern_name;

        match self.repository.find_pattern(name).await? {
            None => {
                let pattern = Pattern::from_classification(classification, observed_at);
                match self.repository.insert_pattern(&pattern).await {
                    Ok(()) => {}
                    Err(StoreError::Conflict(detail)) => return Ok(Attempt::Conflict(detail)),
                    Err(e) => return Err(e.into()),
                }

                metrics::counter!("pmem_patterns_created_total", "classification" => pattern.classification.name_prefix())
                    .increment(1);
                info!(
                    pattern_name = %pattern.name,
                    classification = %pattern.classification,
                    confidence = pattern.confidence,
                    "Created pattern"
                );

                let event = CortexEvent::PatternCreated {
                    name: pattern.name.clone(),
                    classification: pattern.classification,
                    confidence: pattern.confidence,
                    timestamp: observed_at,
                };
                Ok(Attempt::Done(pattern, event))
            }
            Some(mut pattern) => {
                if pattern.classification != classification.classification {
                    return Err(CortexError::ClassificationConflict {
                        name: name.clone(),
                        existing: pattern.classification,
                        attempted: classification.classification,
                    });
                }

                let expected_revision = pattern.revision;
                let old_confidence = pattern.confidence;
                pattern.observe(classification, self.policy, observed_at);

                match self.repository.update_pattern(&pattern, expected_revision).await {
                    Ok(()) => {}
                    // Patterns are never deleted, so a vanished row is a concurrent writer too
                    Err(StoreError::Conflict(detail)) | Err(StoreError::NotFound(detail)) => {
                        return Ok(Attempt::Conflict(detail))
                    }
                    Err(e) => return Err(e.into()),
                }

                metrics::counter!("pmem_patterns_reinforced_total", "classification" => pattern.classification.name_prefix())
                    .increment(1);
                debug!(
                    pattern_name = %pattern.name,
                    occurrences = pattern.occurrences,
                    old_confidence,
                    new_confidence = pattern.confidence,
                    "Reinforced pattern"
                );

                let event = CortexEvent::PatternReinforced {
                    name: pattern.name.clone(),
                    occurrences: pattern.occurrences,
                    old_confidence,
                    new_confidence: pattern.confidence,
                    timestamp: observed_at,
                };
                Ok(Attempt::Done(pattern, event))
            }
        }
    }

    pub async fn get(&self, name: &str) -> Result<Pattern, CortexError> {
        self.repository
            .find_pattern(name)
            .await?
            .ok_or_else(|| CortexError::PatternNotFound(name.to_string()))
    }
}

fn validate(classification: &Classification) -> Result<(), CortexError> {
    if classification.pattern_name.trim().is_empty() {
        return Err(CortexError::InvalidArgument("pattern_name cannot be empty".to_string()));
    }
    if !classification.confidence.is_finite() || !(0.0..=1.0).contains(&classification.confidence) {
        return Err(CortexError::InvalidArgument(format!(
            "confidence must be within [0, 1], got {}",
            classification.confidence
        )));
    }
    Ok(())
}
