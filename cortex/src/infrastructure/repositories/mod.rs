// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of [`PatternRepository`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve patterns and links
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **InMemoryPatternRepository** - Thread-safe HashMap-backed storage for
//!   development, tests and single-process deployments
//! - **PostgresPatternRepository** - `patterns` and `pattern_links` tables

pub mod postgres;

pub use postgres::PostgresPatternRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::link::{Link, LinkKey};
use crate::domain::pattern::{rank_order, Pattern};
use crate::domain::repository::{PatternQuery, PatternRepository, StoreStats};
use crate::domain::StoreError;

#[derive(Default)]
struct MemoryState {
    patterns: HashMap<String, Pattern>,
    links: HashMap<LinkKey, Link>,
}

#[derive(Clone, Default)]
pub struct InMemoryPatternRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryPatternRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl PatternRepository for InMemoryPatternRepository {
    async fn insert_pattern(&self, pattern: &Pattern) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.patterns.contains_key(&pattern.name) {
            return Err(StoreError::Conflict(format!(
                "pattern '{}' already exists",
                pattern.name
            )));
        }
        state.patterns.insert(pattern.name.clone(), pattern.clone());
        Ok(())
    }

    async fn update_pattern(&self, pattern: &Pattern, expected_revision: u64) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .patterns
            .get_mut(&pattern.name)
            .ok_or_else(|| StoreError::NotFound(pattern.name.clone()))?;
        if stored.revision != expected_revision {
            return Err(StoreError::Conflict(format!(
                "pattern '{}' is at revision {}, expected {}",
                pattern.name, stored.revision, expected_revision
            )));
        }
        *stored = pattern.clone();
        Ok(())
    }

    async fn find_pattern(&self, name: &str) -> Result<Option<Pattern>, StoreError> {
        Ok(self.read()?.patterns.get(name).cloned())
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let state = self.read()?;
        let mut names: Vec<String> = state
            .patterns
            .values()
            .filter(|p| p.is_stale(cutoff))
            .map(|p| p.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn query_patterns(&self, query: &PatternQuery) -> Result<Vec<Pattern>, StoreError> {
        let state = self.read()?;
        let mut matches: Vec<Pattern> = state
            .patterns
            .values()
            .filter(|p| p.classification == query.classification)
            .filter(|p| query.include_dormant || !p.is_dormant())
            .filter(|p| match &query.domain {
                Some(domain) => p.domain.as_deref() == Some(domain.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        matches.sort_by(rank_order);
        matches.truncate(query.limit);
        Ok(matches)
    }

    async fn insert_link(&self, link: &Link) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let key = link.key();
        if state.links.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "link {} -> {} already exists",
                link.source, link.target
            )));
        }
        state.links.insert(key, link.clone());
        Ok(())
    }

    async fn update_link(&self, link: &Link, expected_revision: u64) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .links
            .get_mut(&link.key())
            .ok_or_else(|| StoreError::NotFound(format!("{} -> {}", link.source, link.target)))?;
        if stored.revision != expected_revision {
            return Err(StoreError::Conflict(format!(
                "link {} -> {} is at revision {}, expected {}",
                link.source, link.target, stored.revision, expected_revision
            )));
        }
        *stored = link.clone();
        Ok(())
    }

    async fn find_link(&self, source: &str, target: &str) -> Result<Option<Link>, StoreError> {
        Ok(self.read()?.links.get(&LinkKey::new(source, target)).cloned())
    }

    async fn links_touching(&self, name: &str) -> Result<Vec<Link>, StoreError> {
        let state = self.read()?;
        let mut links: Vec<Link> = state
            .links
            .values()
            .filter(|l| l.touches(name))
            .cloned()
            .collect();
        links.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(links)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let state = self.read()?;
        let mut stats = StoreStats {
            total: state.patterns.len() as u64,
            link_count: state.links.len() as u64,
            ..Default::default()
        };
        for pattern in state.patterns.values() {
            match pattern.classification {
                crate::domain::Outcome::Success => stats.success_count += 1,
                crate::domain::Outcome::Failure => stats.failure_count += 1,
            }
            if pattern.is_dormant() {
                stats.dormant_count += 1;
            }
        }
        if !state.links.is_empty() {
            let sum: f64 = state.links.values().map(|l| l.strength).sum();
            stats.avg_link_strength = sum / state.links.len() as f64;
        }
        Ok(stats)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Classification, Outcome};
    use chrono::Duration;

    fn pattern(name: &str, outcome: Outcome, occurrences: u64) -> Pattern {
        let mut p = Pattern::from_classification(&Classification::new(name, outcome, "r", 0.5), Utc::now());
        p.occurrences = occurrences;
        p
    }

    #[tokio::test]
    async fn test_insert_conflicts_on_existing_name() {
        let repo = InMemoryPatternRepository::new();
        let p = pattern("success:a:00000000", Outcome::Success, 1);
        repo.insert_pattern(&p).await.unwrap();

        let err = repo.insert_pattern(&p).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_checks_revision() {
        let repo = InMemoryPatternRepository::new();
        let mut p = pattern("success:a:00000000", Outcome::Success, 1);
        repo.insert_pattern(&p).await.unwrap();

        p.occurrences = 2;
        p.revision = 2;
        repo.update_pattern(&p, 1).await.unwrap();

        let err = repo.update_pattern(&p, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(repo.find_pattern(&p.name).await.unwrap().unwrap().occurrences, 2);
    }

    #[tokio::test]
    async fn test_query_filters_and_ranks() {
        let repo = InMemoryPatternRepository::new();
        repo.insert_pattern(&pattern("success:a:1", Outcome::Success, 2)).await.unwrap();
        repo.insert_pattern(&pattern("success:b:2", Outcome::Success, 5)).await.unwrap();
        repo.insert_pattern(&pattern("success:c:3", Outcome::Success, 0)).await.unwrap();
        repo.insert_pattern(&pattern("failure:d:4", Outcome::Failure, 9)).await.unwrap();

        let query = PatternQuery {
            classification: Outcome::Success,
            domain: None,
            include_dormant: false,
            limit: 10,
        };
        let names: Vec<_> = repo
            .query_patterns(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["success:b:2", "success:a:1"]);

        let with_dormant = PatternQuery { include_dormant: true, limit: 2, ..query };
        assert_eq!(repo.query_patterns(&with_dormant).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_stale_and_stats() {
        let repo = InMemoryPatternRepository::new();
        let mut old = pattern("failure:old:1", Outcome::Failure, 1);
        old.last_seen = Utc::now() - Duration::days(30);
        repo.insert_pattern(&old).await.unwrap();
        repo.insert_pattern(&pattern("success:new:2", Outcome::Success, 1)).await.unwrap();
        repo.insert_link(&Link::new("success:new:2", "failure:old:1", 0.4, 10.0, Utc::now()))
            .await
            .unwrap();

        let stale = repo.find_stale(Utc::now() - Duration::days(7)).await.unwrap();
        assert_eq!(stale, vec!["failure:old:1"]);

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.link_count, 1);
        assert!((stats.avg_link_strength - 0.4).abs() < 1e-9);
        assert_eq!(repo.links_touching("failure:old:1").await.unwrap().len(), 1);
    }
}
