// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pattern Memory Cortex
//!
//! Learns from classified task outcomes: every finished task is labelled
//! SUCCESS or FAILURE, folded into a named pattern, and optionally linked to
//! the opposite-outcome pattern it remedies. Unused patterns decay over time.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Classifier, pattern store, link manager, decay engine, queries
//!
//! Start from [`application::CortexRuntime::from_config`], which wires the
//! configured strategy and repository into a [`application::LearningService`].

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
