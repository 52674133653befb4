// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the pattern memory CLI

pub mod config;
pub mod daemon;
pub mod decay;
pub mod learn;
pub mod link;
pub mod query;

pub use self::config::ConfigCommand;
pub use self::daemon::DaemonCommand;
pub use self::decay::DecayArgs;
pub use self::learn::LearnArgs;
pub use self::link::LinkArgs;
pub use self::query::QueryCommand;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use pattern_memory_cortex::application::{DecayReport, LearnOutcome, Remedy};
use pattern_memory_cortex::{Link, Outcome, Pattern, StoreStats, TaskResult};

use crate::daemon::server::DecayRequest;
use crate::daemon::{check_daemon_running, DaemonClient, DaemonStatus};
use crate::embedded::EmbeddedExecutor;

/// Where a command runs: a live daemon, or services built in-process
pub enum MemoryTarget {
    Daemon(DaemonClient),
    Embedded(Box<EmbeddedExecutor>),
}

impl MemoryTarget {
    /// Use the daemon when it answers `/health`, otherwise run embedded
    pub async fn connect(config_path: Option<PathBuf>, host: &str, port: u16) -> Result<Self> {
        let daemon_status = check_daemon_running(host, port).await;
        if matches!(daemon_status, Ok(DaemonStatus::Running { .. })) {
            info!("Delegating to daemon API");
            Ok(Self::Daemon(DaemonClient::new(host, port)?))
        } else {
            info!("Daemon not running, using embedded mode");
            Ok(Self::Embedded(Box::new(EmbeddedExecutor::new(config_path).await?)))
        }
    }

    pub fn is_daemon(&self) -> bool {
        matches!(self, Self::Daemon(_))
    }

    pub async fn learn(&self, result: &TaskResult) -> Result<LearnOutcome> {
        match self {
            Self::Daemon(client) => client.learn(result).await,
            Self::Embedded(executor) => executor.learn(result).await,
        }
    }

    pub async fn link(&self, success: &str, failure: &str, reinforcement: Option<f64>) -> Result<Link> {
        match self {
            Self::Daemon(client) => client.link(success, failure, reinforcement).await,
            Self::Embedded(executor) => executor.link(success, failure, reinforcement).await,
        }
    }

    pub async fn best_practices(
        &self,
        domain: Option<&str>,
        classification: Outcome,
        limit: usize,
    ) -> Result<Vec<Pattern>> {
        match self {
            Self::Daemon(client) => client.best_practices(domain, classification, limit).await,
            Self::Embedded(executor) => executor.best_practices(domain, classification, limit).await,
        }
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        match self {
            Self::Daemon(client) => client.stats().await,
            Self::Embedded(executor) => executor.stats().await,
        }
    }

    pub async fn get_pattern(&self, name: &str) -> Result<Pattern> {
        match self {
            Self::Daemon(client) => client.get_pattern(name).await,
            Self::Embedded(executor) => executor.get_pattern(name).await,
        }
    }

    pub async fn remedies(&self, failure_name: &str, limit: usize) -> Result<Vec<Remedy>> {
        match self {
            Self::Daemon(client) => client.remedies(failure_name, limit).await,
            Self::Embedded(executor) => executor.remedies(failure_name, limit).await,
        }
    }

    pub async fn decay(&self, request: &DecayRequest) -> Result<DecayReport> {
        match self {
            Self::Daemon(client) => client.decay(request).await,
            Self::Embedded(executor) => executor.decay(request).await,
        }
    }
}

/// Print a value as pretty JSON
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
