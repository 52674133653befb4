// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value objects, entities and contracts of the pattern memory.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Classification, patterns, links, events and the repository seam

pub mod classification;
pub mod config;
pub mod errors;
pub mod events;
pub mod link;
pub mod llm;
pub mod naming;
pub mod pattern;
pub mod repository;

pub use classification::*;
pub use errors::*;
pub use events::*;
pub use link::*;
pub use naming::*;
pub use pattern::*;
pub use repository::*;
