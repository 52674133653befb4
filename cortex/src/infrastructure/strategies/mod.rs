// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Classification strategies

pub mod llm_backed;
pub mod rule_based;

pub use llm_backed::LlmClassificationStrategy;
pub use rule_based::RuleBasedStrategy;
