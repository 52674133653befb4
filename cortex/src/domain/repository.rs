// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Pattern Repository Interface
//!
//! Persistence contract for patterns and their BEST_PRACTICE links.
//!
//! | Implementation | Backend |
//! |----------------|---------|
//! | `InMemoryPatternRepository` | process-local maps, development and tests |
//! | `PostgresPatternRepository` | `patterns` + `pattern_links` tables |
//!
//! Every write is revision-checked: `update_*` succeeds only when the stored
//! revision equals `expected_revision`, and `insert_*` fails with
//! [`StoreError::Conflict`] when the key already exists. Callers hold the
//! per-name lock while they read-modify-write, so conflicts only arise when
//! several processes share one database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classification::Outcome;
use super::errors::StoreError;
use super::link::Link;
use super::pattern::Pattern;

/// Filter for ranked pattern retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct PatternQuery {
    pub classification: Outcome,
    pub domain: Option<String>,
    pub include_dormant: bool,
    pub limit: usize,
}

/// Aggregate counters for dashboards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub dormant_count: u64,
    pub link_count: u64,
    pub avg_link_strength: f64,
}

#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// Insert a brand-new pattern
    async fn insert_pattern(&self, pattern: &Pattern) -> Result<(), StoreError>;

    /// Replace a stored pattern if its revision is still `expected_revision`
    async fn update_pattern(&self, pattern: &Pattern, expected_revision: u64) -> Result<(), StoreError>;

    async fn find_pattern(&self, name: &str) -> Result<Option<Pattern>, StoreError>;

    /// Names of patterns whose `last_seen` is strictly before `cutoff`
    async fn find_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    /// Ranked retrieval, ordered by occurrences, confidence, last_seen (all desc)
    async fn query_patterns(&self, query: &PatternQuery) -> Result<Vec<Pattern>, StoreError>;

    async fn insert_link(&self, link: &Link) -> Result<(), StoreError>;

    async fn update_link(&self, link: &Link, expected_revision: u64) -> Result<(), StoreError>;

    async fn find_link(&self, source: &str, target: &str) -> Result<Option<Link>, StoreError>;

    /// All links where `name` is the source or the target
    async fn links_touching(&self, name: &str) -> Result<Vec<Link>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Cheap reachability check used by the daemon's health endpoint
    async fn health_check(&self) -> Result<(), StoreError>;
}
