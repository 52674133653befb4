// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Decay scheduler - periodic background decay pass
//!
//! The core never schedules itself. The daemon owns this task when
//! `spec.decay.schedule.enabled` is set, and stops it through the shared
//! shutdown token.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pattern_memory_cortex::application::DecayEngine;
use pattern_memory_cortex::domain::config::DecayConfig;

#[derive(Debug, Clone)]
pub struct DecaySchedulerConfig {
    pub interval: Duration,
    pub decay_after: Duration,
    pub enabled: bool,
}

impl From<&DecayConfig> for DecaySchedulerConfig {
    fn from(config: &DecayConfig) -> Self {
        Self {
            interval: config.schedule.interval,
            decay_after: config.decay_after,
            enabled: config.schedule.enabled,
        }
    }
}

pub struct DecayScheduler {
    engine: Arc<DecayEngine>,
    config: DecaySchedulerConfig,
    shutdown_token: CancellationToken,
}

impl DecayScheduler {
    pub fn new(engine: Arc<DecayEngine>, config: DecaySchedulerConfig, shutdown_token: CancellationToken) -> Self {
        Self {
            engine,
            config,
            shutdown_token,
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Decay scheduler is disabled");
            return;
        }
        if self.config.interval.is_zero() {
            warn!("Decay scheduler interval is zero, not starting");
            return;
        }

        info!(
            interval_secs = self.config.interval.as_secs(),
            decay_after_secs = self.config.decay_after.as_secs(),
            "Starting decay scheduler"
        );

        let mut tick = interval(self.config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so a restart does not decay right away.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!("Decay scheduler shutting down");
                    break;
                }
                _ = tick.tick() => {
                    debug!("Running scheduled decay pass");
                    match self.engine.decay(Utc::now(), self.config.decay_after).await {
                        Ok(report) => info!(
                            decayed = report.patterns_decayed,
                            links_weakened = report.links_weakened,
                            skipped = report.skipped,
                            "Scheduled decay pass completed"
                        ),
                        Err(e) => warn!(error = %e, "Scheduled decay pass failed"),
                    }
                }
            }
        }
    }
}
