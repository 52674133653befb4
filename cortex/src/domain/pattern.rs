// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::classification::{Classification, Outcome};

/// How a repeated observation's confidence is merged into the stored value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ConfidencePolicy {
    /// `new = (1 - weight) * old + weight * sample`
    Ema { weight: f64 },
    /// `new = sample`
    Replace,
    /// `new = max(old, sample)`
    Max,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        ConfidencePolicy::Ema { weight: 0.3 }
    }
}

impl ConfidencePolicy {
    pub fn merge(&self, current: f64, sample: f64) -> f64 {
        let merged = match self {
            ConfidencePolicy::Ema { weight } => (1.0 - weight) * current + weight * sample,
            ConfidencePolicy::Replace => sample,
            ConfidencePolicy::Max => current.max(sample),
        };
        merged.clamp(0.0, 1.0)
    }
}

/// A named, classified record of an observed task outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub classification: Outcome,
    pub reason: String,
    pub confidence: f64,
    pub occurrences: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every persisted change
    #[serde(default)]
    pub revision: u64,
}

impl Pattern {
    /// First observation of a pattern name
    pub fn from_classification(classification: &Classification, observed_at: DateTime<Utc>) -> Self {
        Self {
            name: classification.pattern_name.clone(),
            classification: classification.classification,
            reason: classification.reason.clone(),
            confidence: classification.confidence.clamp(0.0, 1.0),
            occurrences: 1,
            domain: classification.domain.clone(),
            created_at: observed_at,
            last_seen: observed_at,
            revision: 1,
        }
    }

    /// Fold a repeat observation into this pattern.
    ///
    /// The caller must have checked that the classification matches.
    pub fn observe(
        &mut self,
        classification: &Classification,
        policy: ConfidencePolicy,
        observed_at: DateTime<Utc>,
    ) {
        debug_assert_eq!(self.classification, classification.classification);

        self.occurrences = self.occurrences.saturating_add(1);
        self.confidence = policy.merge(self.confidence, classification.confidence);
        self.reason = classification.reason.clone();
        if self.domain.is_none() {
            self.domain = classification.domain.clone();
        }
        if observed_at > self.last_seen {
            self.last_seen = observed_at;
        }
        self.revision += 1;
    }

    /// Forget one occurrence. Returns true when this call made the pattern dormant.
    pub fn decay_once(&mut self) -> bool {
        if self.occurrences == 0 {
            return false;
        }
        self.occurrences -= 1;
        self.revision += 1;
        self.occurrences == 0
    }

    /// Dormant patterns are kept for history but excluded from default queries
    pub fn is_dormant(&self) -> bool {
        self.occurrences == 0
    }

    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_seen < cutoff
    }
}

/// Retrieval order: occurrences desc, confidence desc, last_seen desc, name asc
pub fn rank_order(a: &Pattern, b: &Pattern) -> Ordering {
    b.occurrences
        .cmp(&a.occurrences)
        .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
        .then_with(|| b.last_seen.cmp(&a.last_seen))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn classification(confidence: f64) -> Classification {
        Classification::new("success:summarize-article:00000000", Outcome::Success, "good", confidence)
    }

    #[test]
    fn test_pattern_creation() {
        let now = Utc::now();
        let pattern = Pattern::from_classification(&classification(0.8).with_domain("news"), now);

        assert_eq!(pattern.occurrences, 1);
        assert_eq!(pattern.created_at, now);
        assert_eq!(pattern.last_seen, now);
        assert_eq!(pattern.domain.as_deref(), Some("news"));
        assert!(!pattern.is_dormant());
    }

    #[test]
    fn test_observe_applies_ema() {
        let now = Utc::now();
        let mut pattern = Pattern::from_classification(&classification(0.5), now);

        pattern.observe(&classification(1.0), ConfidencePolicy::default(), now + Duration::minutes(1));

        assert_eq!(pattern.occurrences, 2);
        assert!((pattern.confidence - 0.65).abs() < 1e-9);
        assert_eq!(pattern.last_seen, now + Duration::minutes(1));
        assert_eq!(pattern.revision, 2);
    }

    #[test]
    fn test_other_confidence_policies() {
        assert_eq!(ConfidencePolicy::Replace.merge(0.9, 0.2), 0.2);
        assert_eq!(ConfidencePolicy::Max.merge(0.9, 0.2), 0.9);
        assert_eq!(ConfidencePolicy::Ema { weight: 1.0 }.merge(0.9, 0.2), 0.2);
    }

    #[test]
    fn test_observe_keeps_latest_last_seen() {
        let now = Utc::now();
        let mut pattern = Pattern::from_classification(&classification(0.5), now);
        pattern.observe(&classification(0.5), ConfidencePolicy::Replace, now - Duration::days(2));
        assert_eq!(pattern.last_seen, now);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut pattern = Pattern::from_classification(&classification(0.5), Utc::now());

        assert!(pattern.decay_once());
        assert!(pattern.is_dormant());
        assert!(!pattern.decay_once());
        assert_eq!(pattern.occurrences, 0);
    }

    #[test]
    fn test_rank_order() {
        let now = Utc::now();
        let mut a = Pattern::from_classification(&classification(0.5), now);
        a.name = "a".into();
        a.occurrences = 3;
        let mut b = a.clone();
        b.name = "b".into();
        b.confidence = 0.9;
        let mut c = a.clone();
        c.name = "c".into();
        c.occurrences = 5;

        let mut ranked = vec![a, b, c];
        ranked.sort_by(rank_order);
        let names: Vec<_> = ranked.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }
}
