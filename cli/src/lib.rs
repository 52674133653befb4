// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pattern memory CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** HTTP daemon, daemon client and embedded command execution

pub mod commands;
pub mod daemon;
pub mod embedded;
