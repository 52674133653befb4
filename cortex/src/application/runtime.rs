// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Composition root
//!
//! [`CortexRuntime::from_config`] selects the repository backend and the
//! classification strategy from configuration and wires every service around
//! one shared lock map and event bus.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::domain::config::{PatternMemoryConfig, StorageBackend, StrategyKind};
use crate::domain::llm::GenerationOptions;
use crate::domain::repository::PatternRepository;
use crate::domain::ClassificationStrategy;
use crate::infrastructure::db::Database;
use crate::infrastructure::llm::provider_from_config;
use crate::infrastructure::{
    BroadcastEventBus, InMemoryPatternRepository, KeyedLocks, LlmClassificationStrategy,
    PostgresPatternRepository, RuleBasedStrategy,
};

use super::classifier::OutcomeClassifier;
use super::decay_engine::DecayEngine;
use super::learning_service::{LearningOptions, LearningService};
use super::link_manager::LinkManager;
use super::pattern_store::PatternStore;
use super::query_service::QueryService;
use super::retry::{RetryPolicy, RetryingLearner};

#[derive(Clone)]
pub struct CortexRuntime {
    pub config: PatternMemoryConfig,
    pub repository: Arc<dyn PatternRepository>,
    pub event_bus: BroadcastEventBus,
    pub classifier: Arc<OutcomeClassifier>,
    pub store: Arc<PatternStore>,
    pub links: Arc<LinkManager>,
    pub decay: Arc<DecayEngine>,
    pub query: Arc<QueryService>,
    pub learning: Arc<LearningService>,
    pub retrying: Arc<RetryingLearner<Arc<LearningService>>>,
}

impl CortexRuntime {
    pub async fn from_config(config: &PatternMemoryConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let repository = build_repository(config).await?;
        let strategy = build_strategy(config)?;
        Ok(Self::with_components(config.clone(), repository, strategy))
    }

    /// Wire services around an explicit repository and strategy
    pub fn with_components(
        config: PatternMemoryConfig,
        repository: Arc<dyn PatternRepository>,
        strategy: Arc<dyn ClassificationStrategy>,
    ) -> Self {
        let spec = &config.spec;
        let event_bus = BroadcastEventBus::with_default_capacity();
        let bus: Arc<dyn super::EventBus> = Arc::new(event_bus.clone());
        let locks = Arc::new(KeyedLocks::new());

        let classifier = Arc::new(OutcomeClassifier::new(strategy, spec.classifier.timeout));
        let store = Arc::new(PatternStore::new(
            repository.clone(),
            locks.clone(),
            bus.clone(),
            spec.learning.confidence,
        ));
        let links = Arc::new(
            LinkManager::new(repository.clone(), locks.clone(), bus.clone())
                .with_limits(spec.links.default_reinforcement, spec.links.strength_ceiling),
        );
        let decay = Arc::new(
            DecayEngine::new(repository.clone(), locks, bus)
                .with_link_decay_fraction(spec.decay.link_decay_fraction),
        );
        let query = Arc::new(QueryService::new(repository.clone()));
        let learning = Arc::new(LearningService::new(
            classifier.clone(),
            store.clone(),
            links.clone(),
            LearningOptions {
                auto_link: spec.learning.auto_link,
                min_confidence_to_store: spec.learning.min_confidence_to_store,
            },
        ));
        let retrying = Arc::new(RetryingLearner::new(
            learning.clone(),
            RetryPolicy::from(&spec.retry),
        ));

        info!(
            strategy = classifier.strategy_name(),
            backend = ?spec.store.backend,
            "Pattern memory runtime ready"
        );

        Self {
            config,
            repository,
            event_bus,
            classifier,
            store,
            links,
            decay,
            query,
            learning,
            retrying,
        }
    }

    /// In-memory store with the rule-based strategy and default settings
    pub fn in_memory() -> Self {
        let config = PatternMemoryConfig::default();
        let threshold = config.spec.classifier.threshold;
        Self::with_components(
            config,
            Arc::new(InMemoryPatternRepository::new()),
            Arc::new(RuleBasedStrategy::new(threshold)),
        )
    }
}

async fn build_repository(config: &PatternMemoryConfig) -> Result<Arc<dyn PatternRepository>> {
    let store = &config.spec.store;
    match store.backend {
        StorageBackend::InMemory => {
            info!("Using in-memory pattern repository");
            Ok(Arc::new(InMemoryPatternRepository::new()))
        }
        StorageBackend::Postgres => {
            let url = store
                .database_url
                .as_deref()
                .context("store.database_url is required for the postgres backend")?;
            let database = Database::new(url, store.max_connections).await?;
            let repository = PostgresPatternRepository::new(database.get_pool().clone());
            if store.migrate {
                repository.migrate().await?;
            }
            info!("Using PostgreSQL pattern repository");
            Ok(Arc::new(repository))
        }
    }
}

fn build_strategy(config: &PatternMemoryConfig) -> Result<Arc<dyn ClassificationStrategy>> {
    let classifier = &config.spec.classifier;
    match classifier.strategy {
        StrategyKind::RuleBased => Ok(Arc::new(RuleBasedStrategy::new(classifier.threshold))),
        StrategyKind::Llm => {
            let llm = classifier
                .llm
                .as_ref()
                .context("classifier.llm is required for the llm strategy")?;
            info!(provider = ?llm.provider, model = %llm.model, endpoint = %llm.endpoint, "Using LLM classification strategy");
            Ok(Arc::new(LlmClassificationStrategy::new(
                provider_from_config(llm),
                GenerationOptions {
                    max_tokens: Some(llm.max_tokens),
                    temperature: Some(llm.temperature),
                },
            )))
        }
    }
}
