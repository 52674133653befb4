// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Decay Engine
//!
//! Forgets patterns that have not been observed recently. One run:
//!
//! 1. lists patterns with `last_seen < now - decay_after`;
//! 2. for each, under its own per-name lock, re-reads it, removes one
//!    occurrence (floor 0) and weakens every touching link by
//!    `link_decay_fraction` of its current strength;
//! 3. reports what changed.
//!
//! Runs never hold a global lock, so upserts continue while decay is in
//! progress. A pattern reinforced after the scan started is left alone. A
//! link shared by two stale patterns is weakened once per run. Patterns that
//! reach zero occurrences become dormant and are kept.
//!
//! The engine has no timer. Scheduling is the caller's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::application::EventBus;
use crate::domain::repository::PatternRepository;
use crate::domain::{CortexError, CortexEvent, LinkKey, StoreError};
use crate::infrastructure::KeyedLocks;

use super::pattern_store::MAX_CONFLICT_ATTEMPTS;

pub const DEFAULT_DECAY_AFTER: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_LINK_DECAY_FRACTION: f64 = 0.1;

/// Summary of one decay run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayReport {
    /// Stale patterns found by the initial scan
    pub patterns_scanned: usize,
    /// Patterns that lost an occurrence
    pub patterns_decayed: usize,
    pub links_weakened: usize,
    /// Patterns whose occurrences went from 1 to 0 in this run
    pub newly_dormant: usize,
    /// Patterns left untouched because they were reinforced after the scan
    pub refreshed: usize,
    /// Patterns (or their links) that could not be processed
    pub skipped: usize,
    pub cutoff: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

enum PatternOutcome {
    Refreshed,
    Missing,
    Decayed {
        occurrences: u64,
        decremented: bool,
        became_dormant: bool,
    },
}

pub struct DecayEngine {
    repository: Arc<dyn PatternRepository>,
    locks: Arc<KeyedLocks>,
    event_bus: Arc<dyn EventBus>,
    link_decay_fraction: f64,
}

impl DecayEngine {
    pub fn new(
        repository: Arc<dyn PatternRepository>,
        locks: Arc<KeyedLocks>,
        event_bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            repository,
            locks,
            event_bus,
            link_decay_fraction: DEFAULT_LINK_DECAY_FRACTION,
        }
    }

    pub fn with_link_decay_fraction(mut self, fraction: f64) -> Self {
        self.link_decay_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub async fn decay(&self, now: DateTime<Utc>, decay_after: Duration) -> Result<DecayReport, CortexError> {
        if decay_after.is_zero() {
            return Err(CortexError::InvalidArgument("decay_after must be positive".to_string()));
        }
        let window = chrono::Duration::from_std(decay_after)
            .map_err(|e| CortexError::InvalidArgument(format!("decay_after out of range: {}", e)))?;
        let cutoff = now
            .checked_sub_signed(window)
            .ok_or_else(|| CortexError::InvalidArgument("decay_after reaches before the epoch".to_string()))?;

        let started_at = Utc::now();
        let timer = Instant::now();

        let stale = self.repository.find_stale(cutoff).await?;
        debug!(count = stale.len(), %cutoff, "Found stale patterns");

        let mut report = DecayReport {
            patterns_scanned: stale.len(),
            patterns_decayed: 0,
            links_weakened: 0,
            newly_dormant: 0,
            refreshed: 0,
            skipped: 0,
            cutoff,
            started_at,
            duration_ms: 0,
        };
        let mut weakened: HashSet<LinkKey> = HashSet::new();

        for name in &stale {
            let _guard = self.locks.lock(name).await;

            let outcome = match self.decay_pattern(name, cutoff).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(pattern_name = %name, error = %e, "Failed to decay pattern, skipping");
                    report.skipped += 1;
                    continue;
                }
            };

            let (occurrences, decremented, became_dormant) = match outcome {
                PatternOutcome::Refreshed => {
                    debug!(pattern_name = %name, "Pattern reinforced since scan, leaving it alone");
                    report.refreshed += 1;
                    continue;
                }
                PatternOutcome::Missing => {
                    warn!(pattern_name = %name, "Stale pattern vanished during decay");
                    report.skipped += 1;
                    continue;
                }
                PatternOutcome::Decayed {
                    occurrences,
                    decremented,
                    became_dormant,
                } => (occurrences, decremented, became_dormant),
            };

            let links_weakened = match self.weaken_links(name, now, &mut weakened).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(pattern_name = %name, error = %e, "Failed to weaken links of decayed pattern");
                    report.skipped += 1;
                    0
                }
            };
            report.links_weakened += links_weakened;

            if decremented {
                report.patterns_decayed += 1;
                self.event_bus.publish(CortexEvent::PatternDecayed {
                    name: name.clone(),
                    occurrences,
                    links_weakened,
                    timestamp: now,
                });
            }
            if became_dormant {
                report.newly_dormant += 1;
                info!(pattern_name = %name, "Pattern became dormant");
                self.event_bus.publish(CortexEvent::PatternDormant {
                    name: name.clone(),
                    timestamp: now,
                });
            }
        }

        report.duration_ms = timer.elapsed().as_millis() as u64;

        metrics::counter!("pmem_decay_runs_total").increment(1);
        metrics::counter!("pmem_patterns_decayed_total").increment(report.patterns_decayed as u64);
        metrics::counter!("pmem_links_weakened_total").increment(report.links_weakened as u64);

        info!(
            scanned = report.patterns_scanned,
            decayed = report.patterns_decayed,
            links_weakened = report.links_weakened,
            newly_dormant = report.newly_dormant,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            "Decay run completed"
        );

        self.event_bus.publish(CortexEvent::DecayCompleted {
            patterns_decayed: report.patterns_decayed,
            links_weakened: report.links_weakened,
            newly_dormant: report.newly_dormant,
            skipped: report.skipped,
            duration_ms: report.duration_ms,
            timestamp: now,
        });

        Ok(report)
    }

    /// Caller holds the per-name lock
    async fn decay_pattern(&self, name: &str, cutoff: DateTime<Utc>) -> Result<PatternOutcome, CortexError> {
        for attempt in 1..=MAX_CONFLICT_ATTEMPTS {
            let Some(mut pattern) = self.repository.find_pattern(name).await? else {
                return Ok(PatternOutcome::Missing);
            };
            if !pattern.is_stale(cutoff) {
                return Ok(PatternOutcome::Refreshed);
            }

            let expected_revision = pattern.revision;
            let was_active = !pattern.is_dormant();
            let became_dormant = pattern.decay_once();

            if !was_active {
                // Already dormant: nothing to write, links still decay
                return Ok(PatternOutcome::Decayed {
                    occurrences: 0,
                    decremented: false,
                    became_dormant: false,
                });
            }

            match self.repository.update_pattern(&pattern, expected_revision).await {
                Ok(()) => {
                    return Ok(PatternOutcome::Decayed {
                        occurrences: pattern.occurrences,
                        decremented: true,
                        became_dormant,
                    })
                }
                Err(StoreError::Conflict(detail)) => {
                    debug!(pattern_name = name, attempt, %detail, "Revision conflict during decay");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CortexError::StoreUnavailable(format!(
            "pattern '{}' kept changing during decay",
            name
        )))
    }

    async fn weaken_links(
        &self,
        name: &str,
        now: DateTime<Utc>,
        weakened: &mut HashSet<LinkKey>,
    ) -> Result<usize, CortexError> {
        let mut count = 0;

        for link in self.repository.links_touching(name).await? {
            let key = link.key();
            if weakened.contains(&key) {
                continue;
            }

            let mut current = link;
            for attempt in 1..=MAX_CONFLICT_ATTEMPTS {
                let expected_revision = current.revision;
                if !current.weaken(self.link_decay_fraction, now) {
                    break;
                }
                match self.repository.update_link(&current, expected_revision).await {
                    Ok(()) => {
                        weakened.insert(key.clone());
                        count += 1;
                        break;
                    }
                    Err(StoreError::Conflict(detail)) if attempt < MAX_CONFLICT_ATTEMPTS => {
                        debug!(source = %key.source, target = %key.target, %detail, "Revision conflict weakening link");
                        match self.repository.find_link(&key.source, &key.target).await? {
                            Some(fresh) => current = fresh,
                            None => break,
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Classification, Link, Outcome, Pattern};
    use crate::infrastructure::{BroadcastEventBus, InMemoryPatternRepository};

    const DAY: Duration = Duration::from_secs(86_400);

    async fn seed(repo: &InMemoryPatternRepository, name: &str, outcome: Outcome, occurrences: u64, age_days: i64) {
        let mut p = Pattern::from_classification(
            &Classification::new(name, outcome, "r", 0.5),
            Utc::now() - chrono::Duration::days(age_days),
        );
        p.occurrences = occurrences;
        repo.insert_pattern(&p).await.unwrap();
    }

    fn engine(repo: &InMemoryPatternRepository) -> DecayEngine {
        DecayEngine::new(
            Arc::new(repo.clone()),
            Arc::new(KeyedLocks::new()),
            Arc::new(BroadcastEventBus::new(64)),
        )
    }

    #[tokio::test]
    async fn test_only_stale_patterns_decay() {
        let repo = InMemoryPatternRepository::new();
        seed(&repo, "success:old:1", Outcome::Success, 3, 10).await;
        seed(&repo, "success:fresh:2", Outcome::Success, 3, 1).await;

        let report = engine(&repo).decay(Utc::now(), 7 * DAY).await.unwrap();

        assert_eq!(report.patterns_scanned, 1);
        assert_eq!(report.patterns_decayed, 1);
        assert_eq!(repo.find_pattern("success:old:1").await.unwrap().unwrap().occurrences, 2);
        assert_eq!(repo.find_pattern("success:fresh:2").await.unwrap().unwrap().occurrences, 3);
    }

    #[tokio::test]
    async fn test_dormancy_and_floor() {
        let repo = InMemoryPatternRepository::new();
        seed(&repo, "failure:once:1", Outcome::Failure, 1, 30).await;
        let engine = engine(&repo);

        let first = engine.decay(Utc::now(), 7 * DAY).await.unwrap();
        assert_eq!(first.newly_dormant, 1);

        let second = engine.decay(Utc::now(), 7 * DAY).await.unwrap();
        assert_eq!(second.patterns_scanned, 1);
        assert_eq!(second.patterns_decayed, 0);
        assert_eq!(second.newly_dormant, 0);

        let pattern = repo.find_pattern("failure:once:1").await.unwrap().unwrap();
        assert_eq!(pattern.occurrences, 0);
    }

    #[tokio::test]
    async fn test_shared_link_weakened_once_per_run() {
        let repo = InMemoryPatternRepository::new();
        seed(&repo, "success:a:1", Outcome::Success, 2, 10).await;
        seed(&repo, "failure:a:1", Outcome::Failure, 2, 10).await;
        repo.insert_link(&Link::new("success:a:1", "failure:a:1", 1.0, 10.0, Utc::now()))
            .await
            .unwrap();

        let now = Utc::now() + chrono::Duration::days(1);
        let report = engine(&repo).decay(now, 7 * DAY).await.unwrap();

        assert_eq!(report.patterns_decayed, 2);
        assert_eq!(report.links_weakened, 1);
        let link = repo.find_link("success:a:1", "failure:a:1").await.unwrap().unwrap();
        assert!((link.strength - 0.9).abs() < 1e-9);
        assert_eq!(link.updated_at, now);
    }

    #[tokio::test]
    async fn test_zero_strength_links_are_untouched() {
        let repo = InMemoryPatternRepository::new();
        seed(&repo, "success:a:1", Outcome::Success, 2, 10).await;
        seed(&repo, "failure:a:1", Outcome::Failure, 2, 1).await;
        repo.insert_link(&Link::new("success:a:1", "failure:a:1", 0.0, 10.0, Utc::now()))
            .await
            .unwrap();

        let report = engine(&repo).decay(Utc::now(), 7 * DAY).await.unwrap();
        assert_eq!(report.links_weakened, 0);
        let link = repo.find_link("success:a:1", "failure:a:1").await.unwrap().unwrap();
        assert_eq!(link.revision, 1);
    }

    #[tokio::test]
    async fn test_zero_window_is_rejected() {
        let repo = InMemoryPatternRepository::new();
        let err = engine(&repo).decay(Utc::now(), Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, CortexError::InvalidArgument(_)));
    }
}
