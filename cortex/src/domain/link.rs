// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! BEST_PRACTICE edges between patterns
//!
//! A link always points from a SUCCESS pattern to a FAILURE pattern: "this
//! success addresses or avoids that failure mode". Strength grows with
//! reinforcement up to a ceiling and shrinks with decay, never below zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reinforcement applied by `link` when the caller does not pass one
pub const DEFAULT_REINFORCEMENT: f64 = 0.1;

/// Upper bound on link strength
pub const DEFAULT_STRENGTH_CEILING: f64 = 10.0;

/// Ordered (source, target) pair identifying a link
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey {
    pub source: String,
    pub target: String,
}

impl LinkKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub strength: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl Link {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        strength: f64,
        ceiling: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            strength: strength.clamp(0.0, ceiling),
            created_at: now,
            updated_at: now,
            revision: 1,
        }
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.source.clone(), self.target.clone())
    }

    /// Increment strength (reinforcement), capped at `ceiling`
    pub fn reinforce(&mut self, amount: f64, ceiling: f64, now: DateTime<Utc>) {
        self.strength = (self.strength + amount).min(ceiling);
        self.updated_at = now;
        self.revision += 1;
    }

    /// Remove `fraction` of the current strength. Returns false when nothing changed.
    pub fn weaken(&mut self, fraction: f64, now: DateTime<Utc>) -> bool {
        if self.strength <= 0.0 {
            return false;
        }
        self.strength = (self.strength * (1.0 - fraction)).max(0.0);
        self.updated_at = now;
        self.revision += 1;
        true
    }

    pub fn touches(&self, name: &str) -> bool {
        self.source == name || self.target == name
    }
}
