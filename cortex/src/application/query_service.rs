// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Read-only retrieval over the pattern store

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::domain::repository::{PatternQuery, PatternRepository, StoreStats};
use crate::domain::{CortexError, Outcome, Pattern};

pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// A SUCCESS pattern linked to a FAILURE pattern, with the link strength
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remedy {
    pub pattern: Pattern,
    pub strength: f64,
}

pub struct QueryService {
    repository: Arc<dyn PatternRepository>,
}

impl QueryService {
    pub fn new(repository: Arc<dyn PatternRepository>) -> Self {
        Self { repository }
    }

    /// Top patterns of one classification, optionally within a domain.
    ///
    /// Dormant patterns are excluded. Ordered by occurrences, confidence and
    /// last_seen (all descending), ties broken by name.
    pub async fn get_best_practices(
        &self,
        domain: Option<&str>,
        classification: Outcome,
        limit: usize,
    ) -> Result<Vec<Pattern>, CortexError> {
        if limit == 0 {
            return Err(CortexError::InvalidArgument("limit must be positive".to_string()));
        }

        let query = PatternQuery {
            classification,
            domain: domain.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
            include_dormant: false,
            limit,
        };
        Ok(self.repository.query_patterns(&query).await?)
    }

    pub async fn get_stats(&self) -> Result<StoreStats, CortexError> {
        Ok(self.repository.stats().await?)
    }

    pub async fn get_pattern(&self, name: &str) -> Result<Pattern, CortexError> {
        self.repository
            .find_pattern(name)
            .await?
            .ok_or_else(|| CortexError::PatternNotFound(name.to_string()))
    }

    /// SUCCESS patterns linked to a FAILURE pattern, strongest link first
    pub async fn get_remedies(&self, failure_name: &str, limit: usize) -> Result<Vec<Remedy>, CortexError> {
        if limit == 0 {
            return Err(CortexError::InvalidArgument("limit must be positive".to_string()));
        }

        let failure = self.get_pattern(failure_name).await?;
        if failure.classification != Outcome::Failure {
            return Err(CortexError::InvalidArgument(format!(
                "'{}' is {}, remedies exist only for FAILURE patterns",
                failure_name, failure.classification
            )));
        }

        let mut links: Vec<_> = self
            .repository
            .links_touching(failure_name)
            .await?
            .into_iter()
            .filter(|l| l.target == failure_name)
            .collect();
        links.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.source.cmp(&b.source))
        });

        let mut remedies = Vec::with_capacity(limit.min(links.len()));
        for link in links.into_iter().take(limit) {
            if let Some(pattern) = self.repository.find_pattern(&link.source).await? {
                remedies.push(Remedy {
                    pattern,
                    strength: link.strength,
                });
            }
        }
        Ok(remedies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Classification, Link};
    use crate::infrastructure::InMemoryPatternRepository;
    use chrono::Utc;

    async fn seed(repo: &InMemoryPatternRepository, name: &str, outcome: Outcome, occurrences: u64, domain: Option<&str>) {
        let mut c = Classification::new(name, outcome, "r", 0.5);
        if let Some(d) = domain {
            c = c.with_domain(d);
        }
        let mut p = Pattern::from_classification(&c, Utc::now());
        p.occurrences = occurrences;
        repo.insert_pattern(&p).await.unwrap();
    }

    #[tokio::test]
    async fn test_best_practices_by_domain() {
        let repo = InMemoryPatternRepository::new();
        seed(&repo, "success:a:1", Outcome::Success, 4, Some("osint")).await;
        seed(&repo, "success:b:2", Outcome::Success, 9, Some("news")).await;
        seed(&repo, "success:c:3", Outcome::Success, 2, Some("osint")).await;
        let service = QueryService::new(Arc::new(repo));

        let osint = service
            .get_best_practices(Some("osint"), Outcome::Success, 10)
            .await
            .unwrap();
        let names: Vec<_> = osint.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["success:a:1", "success:c:3"]);

        let all = service.get_best_practices(None, Outcome::Success, 1).await.unwrap();
        assert_eq!(all[0].name, "success:b:2");

        let err = service.get_best_practices(None, Outcome::Success, 0).await.unwrap_err();
        assert!(matches!(err, CortexError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_remedies_ordered_by_strength() {
        let repo = InMemoryPatternRepository::new();
        seed(&repo, "failure:x:1", Outcome::Failure, 1, None).await;
        seed(&repo, "success:weak:2", Outcome::Success, 1, None).await;
        seed(&repo, "success:strong:3", Outcome::Success, 1, None).await;
        repo.insert_link(&Link::new("success:weak:2", "failure:x:1", 0.2, 10.0, Utc::now()))
            .await
            .unwrap();
        repo.insert_link(&Link::new("success:strong:3", "failure:x:1", 2.0, 10.0, Utc::now()))
            .await
            .unwrap();
        let service = QueryService::new(Arc::new(repo));

        let remedies = service.get_remedies("failure:x:1", 10).await.unwrap();
        assert_eq!(remedies.len(), 2);
        assert_eq!(remedies[0].pattern.name, "success:strong:3");
        assert_eq!(remedies[0].strength, 2.0);

        let err = service.get_remedies("success:weak:2", 10).await.unwrap_err();
        assert!(matches!(err, CortexError::InvalidArgument(_)));
        let err = service.get_remedies("failure:none:0", 10).await.unwrap_err();
        assert!(matches!(err, CortexError::PatternNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_stats() {
        let service = QueryService::new(Arc::new(InMemoryPatternRepository::new()));
        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats, StoreStats::default());
        assert_eq!(stats.avg_link_strength, 0.0);
    }
}
