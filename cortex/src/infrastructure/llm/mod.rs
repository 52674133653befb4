// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! LLM provider adapters for the model-backed classification strategy

pub mod ollama;
pub mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiCompatibleProvider;

use std::sync::Arc;

use crate::domain::config::{LlmProviderConfig, LlmProviderKind};
use crate::domain::llm::LlmProvider;

/// Build the configured provider
pub fn provider_from_config(config: &LlmProviderConfig) -> Arc<dyn LlmProvider> {
    match config.provider {
        LlmProviderKind::Ollama => Arc::new(OllamaProvider::new(&config.endpoint, &config.model)),
        LlmProviderKind::Openai => Arc::new(OpenAiCompatibleProvider::new(
            &config.endpoint,
            config.resolved_api_key(),
            &config.model,
        )),
    }
}
