// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedded mode execution (when daemon is not running)
//!
//! Builds the runtime in-process from configuration and calls the services
//! directly. Learning goes through the retrying learner so a flaky backend
//! gets the same backoff a daemon client would apply.
//!
//! Each CLI invocation is its own process, so embedded mode only accepts a
//! durable store. The `in_memory` backend lives as long as a running daemon.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;

use pattern_memory_cortex::application::{CortexRuntime, DecayReport, LearnOutcome, Learner, Remedy};
use pattern_memory_cortex::domain::config::{PatternMemoryConfig, StorageBackend};
use pattern_memory_cortex::{Link, Outcome, Pattern, StoreStats, TaskResult};

use crate::daemon::server::DecayRequest;

pub struct EmbeddedExecutor {
    runtime: CortexRuntime,
}

impl EmbeddedExecutor {
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = PatternMemoryConfig::load_or_default(config_path).context("Failed to load configuration")?;
        config.validate().context("Configuration validation failed")?;
        ensure_durable(&config)?;

        let runtime = CortexRuntime::from_config(&config)
            .await
            .context("Failed to initialize pattern memory")?;
        Ok(Self { runtime })
    }

    pub fn from_runtime(runtime: CortexRuntime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &CortexRuntime {
        &self.runtime
    }

    pub async fn learn(&self, result: &TaskResult) -> Result<LearnOutcome> {
        Ok(self.runtime.retrying.learn_from_result(result).await?)
    }

    pub async fn link(&self, success: &str, failure: &str, reinforcement: Option<f64>) -> Result<Link> {
        let links = &self.runtime.links;
        let reinforcement = reinforcement.unwrap_or_else(|| links.default_reinforcement());
        Ok(links.link(success, failure, reinforcement).await?)
    }

    pub async fn best_practices(
        &self,
        domain: Option<&str>,
        classification: Outcome,
        limit: usize,
    ) -> Result<Vec<Pattern>> {
        Ok(self
            .runtime
            .query
            .get_best_practices(domain, classification, limit)
            .await?)
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(self.runtime.query.get_stats().await?)
    }

    pub async fn get_pattern(&self, name: &str) -> Result<Pattern> {
        Ok(self.runtime.query.get_pattern(name).await?)
    }

    pub async fn remedies(&self, failure_name: &str, limit: usize) -> Result<Vec<Remedy>> {
        Ok(self.runtime.query.get_remedies(failure_name, limit).await?)
    }

    pub async fn decay(&self, request: &DecayRequest) -> Result<DecayReport> {
        let decay_after = request
            .decay_after
            .unwrap_or(self.runtime.config.spec.decay.decay_after);
        Ok(self
            .runtime
            .decay
            .decay(request.now.unwrap_or_else(Utc::now), decay_after)
            .await?)
    }
}

/// Reject stores that would be discarded when the command exits
fn ensure_durable(config: &PatternMemoryConfig) -> Result<()> {
    if config.spec.store.backend == StorageBackend::InMemory {
        anyhow::bail!(
            "The in_memory store does not outlive a single command. \
             Start the daemon with `pmem daemon start`, or configure the postgres backend \
             (store.backend: postgres or PMEM_DATABASE_URL)"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_embedded_learn_and_query() {
        let executor = EmbeddedExecutor::from_runtime(CortexRuntime::in_memory());

        let failed = executor
            .learn(&TaskResult::new("parse invoice pdf", "garbled", 0.2))
            .await
            .unwrap();
        let fixed = executor
            .learn(&TaskResult::new("parse invoice pdf", "total: 12", 0.9))
            .await
            .unwrap();
        assert_eq!(fixed.linked_to.as_deref(), Some(failed.pattern_name.as_str()));

        let remedies = executor.remedies(&failed.pattern_name, 5).await.unwrap();
        assert_eq!(remedies.len(), 1);
        assert_eq!(remedies[0].pattern.name, fixed.pattern_name);

        let stats = executor.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.link_count, 1);
    }

    #[tokio::test]
    async fn test_embedded_errors_keep_their_type() {
        let executor = EmbeddedExecutor::from_runtime(CortexRuntime::in_memory());
        let err = executor.get_pattern("nope").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<pattern_memory_cortex::CortexError>(),
            Some(pattern_memory_cortex::CortexError::PatternNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_embedded_refuses_in_memory_store() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let yaml = serde_yaml::to_string(&PatternMemoryConfig::default()).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let err = match EmbeddedExecutor::new(Some(file.path().to_path_buf())).await {
            Ok(_) => panic!("in-memory embedded executor should be refused"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("in_memory"));
        assert!(err.to_string().contains("pmem daemon start"));
    }

    #[test]
    fn test_postgres_store_counts_as_durable() {
        let mut config = PatternMemoryConfig::default();
        assert!(ensure_durable(&config).is_err());

        config.spec.store.backend = StorageBackend::Postgres;
        config.spec.store.database_url = Some("postgres://localhost/pmem".to_string());
        assert!(ensure_durable(&config).is_ok());
    }
}
