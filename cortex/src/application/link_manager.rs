// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Link Manager
//!
//! Creates and reinforces BEST_PRACTICE links from a SUCCESS pattern to the
//! FAILURE pattern it addresses. Repeated linking adds to `strength` up to the
//! configured ceiling; there is never more than one link per ordered pair.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::EventBus;
use crate::domain::link::{DEFAULT_REINFORCEMENT, DEFAULT_STRENGTH_CEILING};
use crate::domain::repository::PatternRepository;
use crate::domain::{CortexError, CortexEvent, Link, Outcome, StoreError};
use crate::infrastructure::KeyedLocks;

use super::pattern_store::MAX_CONFLICT_ATTEMPTS;

pub struct LinkManager {
    repository: Arc<dyn PatternRepository>,
    locks: Arc<KeyedLocks>,
    event_bus: Arc<dyn EventBus>,
    default_reinforcement: f64,
    strength_ceiling: f64,
}

impl LinkManager {
    pub fn new(
        repository: Arc<dyn PatternRepository>,
        locks: Arc<KeyedLocks>,
        event_bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            repository,
            locks,
            event_bus,
            default_reinforcement: DEFAULT_REINFORCEMENT,
            strength_ceiling: DEFAULT_STRENGTH_CEILING,
        }
    }

    pub fn with_limits(mut self, default_reinforcement: f64, strength_ceiling: f64) -> Self {
        self.default_reinforcement = default_reinforcement;
        self.strength_ceiling = strength_ceiling;
        self
    }

    pub fn default_reinforcement(&self) -> f64 {
        self.default_reinforcement
    }

    /// Link with the default reinforcement
    pub async fn link_default(&self, success_name: &str, failure_name: &str) -> Result<Link, CortexError> {
        self.link(success_name, failure_name, self.default_reinforcement).await
    }

    pub async fn link(
        &self,
        success_name: &str,
        failure_name: &str,
        reinforcement: f64,
    ) -> Result<Link, CortexError> {
        if !reinforcement.is_finite() || reinforcement <= 0.0 {
            return Err(CortexError::InvalidArgument(format!(
                "reinforcement must be a positive number, got {}",
                reinforcement
            )));
        }
        if success_name == failure_name {
            return Err(CortexError::InvalidLinkDirection {
                source_name: success_name.to_string(),
                target_name: failure_name.to_string(),
                detail: "a pattern cannot be linked to itself".to_string(),
            });
        }

        let _guard = self.locks.lock_pair(success_name, failure_name).await;

        self.check_endpoint(success_name, failure_name, success_name, Outcome::Success)
            .await?;
        self.check_endpoint(success_name, failure_name, failure_name, Outcome::Failure)
            .await?;

        for attempt in 1..=MAX_CONFLICT_ATTEMPTS {
            let now = Utc::now();
            let (result, event, counter) = match self.repository.find_link(success_name, failure_name).await? {
                None => {
                    let link = Link::new(success_name, failure_name, reinforcement, self.strength_ceiling, now);
                    let result = self.repository.insert_link(&link).await;
                    let event = CortexEvent::LinkCreated {
                        source: link.source.clone(),
                        target: link.target.clone(),
                        strength: link.strength,
                        timestamp: now,
                    };
                    (result.map(|_| link), event, "pmem_links_created_total")
                }
                Some(mut link) => {
                    let expected_revision = link.revision;
                    let old_strength = link.strength;
                    link.reinforce(reinforcement, self.strength_ceiling, now);
                    let result = self.repository.update_link(&link, expected_revision).await;
                    let event = CortexEvent::LinkReinforced {
                        source: link.source.clone(),
                        target: link.target.clone(),
                        old_strength,
                        new_strength: link.strength,
                        timestamp: now,
                    };
                    (result.map(|_| link), event, "pmem_links_reinforced_total")
                }
            };

            match result {
                Ok(link) => {
                    metrics::counter!(counter).increment(1);
                    info!(
                        source = %link.source,
                        target = %link.target,
                        strength = link.strength,
                        "Linked success pattern to failure pattern"
                    );
                    self.event_bus.publish(event);
                    return Ok(link);
                }
                Err(StoreError::Conflict(detail)) => {
                    metrics::counter!("pmem_store_conflicts_total").increment(1);
                    warn!(source = success_name, target = failure_name, attempt, %detail, "Revision conflict on link, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CortexError::StoreUnavailable(format!(
            "link {} -> {} kept changing concurrently after {} attempts",
            success_name, failure_name, MAX_CONFLICT_ATTEMPTS
        )))
    }

    async fn check_endpoint(
        &self,
        success_name: &str,
        failure_name: &str,
        name: &str,
        expected: Outcome,
    ) -> Result<(), CortexError> {
        let pattern = self
            .repository
            .find_pattern(name)
            .await?
            .ok_or_else(|| CortexError::PatternNotFound(name.to_string()))?;

        if pattern.classification != expected {
            return Err(CortexError::InvalidLinkDirection {
                source_name: success_name.to_string(),
                target_name: failure_name.to_string(),
                detail: format!(
                    "'{}' is {} but must be {}",
                    name, pattern.classification, expected
                ),
            });
        }
        Ok(())
    }
}
