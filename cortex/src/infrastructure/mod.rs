// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Adapters behind the domain seams: repositories, LLM providers,
//! classification strategies, the event bus and per-name locks.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Concrete implementations of domain interfaces

pub mod db;
pub mod event_bus;
pub mod keyed_locks;
pub mod llm;
pub mod repositories;
pub mod strategies;

pub use event_bus::{BroadcastEventBus, EventBusError, EventReceiver};
pub use keyed_locks::KeyedLocks;
pub use repositories::{InMemoryPatternRepository, PostgresPatternRepository};
pub use strategies::{LlmClassificationStrategy, RuleBasedStrategy};
