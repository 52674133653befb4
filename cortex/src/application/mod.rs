// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Use-case services of the pattern memory.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Classify, store, link, decay and query patterns

pub mod classifier;
pub mod decay_engine;
pub mod learning_service;
pub mod link_manager;
pub mod pattern_store;
pub mod query_service;
pub mod retry;
pub mod runtime;

pub use classifier::OutcomeClassifier;
pub use decay_engine::{DecayEngine, DecayReport};
pub use learning_service::{LearnOutcome, Learner, LearningOptions, LearningService};
pub use link_manager::LinkManager;
pub use pattern_store::PatternStore;
pub use query_service::{QueryService, Remedy};
pub use retry::{RetryPolicy, RetryingLearner};
pub use runtime::CortexRuntime;

use crate::domain::CortexEvent;

/// Sink for domain events. Publishing never fails the operation that emits.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: CortexEvent);
}
