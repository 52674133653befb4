// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Model-backed classification strategy
//!
//! Sends one fixed prompt to an [`LlmProvider`] and parses a JSON verdict:
//!
//! ```json
//! {"label": "SUCCESS", "reason": "...", "confidence": 0.8, "summary": "summarize article"}
//! ```
//!
//! Every transport, HTTP or parse failure becomes
//! [`CortexError::ClassificationUnavailable`]. The strategy never falls back
//! to a guess.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::domain::llm::{GenerationOptions, LlmProvider};
use crate::domain::{ClassificationStrategy, CortexError, RawClassification};

/// Output is truncated to this many characters before prompting
const MAX_OUTPUT_CHARS: usize = 4000;

const PROMPT_TEMPLATE: &str = r#"You review the result of an automated task and decide whether it succeeded.

Task:
{task}

Output:
{output}

Caller quality score (0-1): {score}

Answer with a single JSON object and nothing else:
{"label": "SUCCESS" or "FAILURE", "reason": "<one sentence>", "confidence": <0-1>, "summary": "<3-6 word description of the task, no specifics>"}"#;

#[allow(clippy::expect_used)]
static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(task|output|score)\}").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct Verdict {
    label: String,
    #[serde(default)]
    reason: String,
    confidence: f64,
    #[serde(default)]
    summary: Option<String>,
}

pub struct LlmClassificationStrategy {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl LlmClassificationStrategy {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self { provider, options }
    }

    fn build_prompt(task: &str, output: &str, quality_score: f64) -> String {
        let output = if output.chars().count() > MAX_OUTPUT_CHARS {
            let truncated: String = output.chars().take(MAX_OUTPUT_CHARS).collect();
            format!("{}\n[... truncated]", truncated)
        } else {
            output.to_string()
        };
        let score = format!("{:.2}", quality_score);
        // One pass so placeholder text inside the task or output stays literal
        RE_PLACEHOLDER
            .replace_all(PROMPT_TEMPLATE, |caps: &Captures| match &caps[1] {
                "task" => task.to_string(),
                "output" => output.clone(),
                _ => score.clone(),
            })
            .into_owned()
    }

    fn parse_verdict(text: &str) -> Result<RawClassification, CortexError> {
        let json = extract_json(text).ok_or_else(|| {
            CortexError::ClassificationUnavailable("model reply contained no JSON object".to_string())
        })?;

        let verdict: Verdict = serde_json::from_str(&json).map_err(|e| {
            CortexError::ClassificationUnavailable(format!("unparseable model verdict: {}", e))
        })?;

        let label = verdict.label.parse().map_err(|_| {
            CortexError::ClassificationUnavailable(format!("model returned unknown label '{}'", verdict.label))
        })?;

        Ok(RawClassification {
            label,
            reason: verdict.reason,
            confidence: verdict.confidence,
            summary: verdict.summary.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Pull the JSON object out of a model reply: a ```json fence, a bare fence,
/// or the outermost braces.
pub fn extract_json(text: &str) -> Option<String> {
    for marker in ["```json", "```"] {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end_offset) = text[content_start..].find("```") {
                let content_end = content_start + end_offset;
                return Some(text[content_start..content_end].trim().to_string());
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].to_string())
}

#[async_trait]
impl ClassificationStrategy for LlmClassificationStrategy {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn classify_raw(
        &self,
        task: &str,
        output: &str,
        quality_score: f64,
    ) -> Result<RawClassification, CortexError> {
        let prompt = Self::build_prompt(task, output, quality_score);

        let response = self
            .provider
            .generate(&prompt, &self.options)
            .await
            .map_err(|e| {
                CortexError::ClassificationUnavailable(format!(
                    "{} provider failed: {}",
                    self.provider.provider_name(),
                    e
                ))
            })?;

        debug!(model = %response.model, "Received classification verdict");
        Self::parse_verdict(&response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{GenerationResponse, LlmError};
    use crate::domain::Outcome;

    struct CannedProvider(Result<&'static str, &'static str>);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<GenerationResponse, LlmError> {
            match self.0 {
                Ok(text) => Ok(GenerationResponse {
                    text: text.to_string(),
                    model: "canned".to_string(),
                }),
                Err(e) => Err(LlmError::Network(e.to_string())),
            }
        }

        fn provider_name(&self) -> &'static str {
            "canned"
        }
    }

    fn strategy(reply: Result<&'static str, &'static str>) -> LlmClassificationStrategy {
        LlmClassificationStrategy::new(Arc::new(CannedProvider(reply)), GenerationOptions::default())
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(
            extract_json("Sure!\n```json\n{\"a\": 1}\n```").as_deref(),
            Some("{\"a\": 1}")
        );
        assert_eq!(extract_json("```\n{\"a\": 2}\n```").as_deref(), Some("{\"a\": 2}"));
        assert_eq!(
            extract_json("verdict: {\"a\": 3} done").as_deref(),
            Some("{\"a\": 3}")
        );
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_prompt_truncates_long_output() {
        let long = "x".repeat(MAX_OUTPUT_CHARS + 10);
        let prompt = LlmClassificationStrategy::build_prompt("task", &long, 0.5);
        assert!(prompt.contains("[... truncated]"));
        assert!(prompt.contains("Caller quality score (0-1): 0.50"));
    }

    #[test]
    fn test_prompt_keeps_placeholder_text_in_user_input() {
        let prompt = LlmClassificationStrategy::build_prompt("render {output} then {score}", "literal {task}", 0.25);
        assert!(prompt.contains("Task:\nrender {output} then {score}\n"));
        assert!(prompt.contains("Output:\nliteral {task}\n"));
        assert!(prompt.contains("Caller quality score (0-1): 0.25"));
        assert!(prompt.contains("{\"label\": \"SUCCESS\""));
    }

    #[tokio::test]
    async fn test_fenced_verdict() {
        let raw = strategy(Ok(
            "```json\n{\"label\": \"failure\", \"reason\": \"empty output\", \"confidence\": 0.9, \"summary\": \"scrape profile\"}\n```",
        ))
        .classify_raw("scrape", "", 0.1)
        .await
        .unwrap();

        assert_eq!(raw.label, Outcome::Failure);
        assert_eq!(raw.reason, "empty output");
        assert_eq!(raw.summary.as_deref(), Some("scrape profile"));
    }

    #[tokio::test]
    async fn test_garbage_reply_is_unavailable() {
        let err = strategy(Ok("I think it went fine"))
            .classify_raw("t", "o", 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, CortexError::ClassificationUnavailable(_)));

        let err = strategy(Ok(r#"{"label": "MAYBE", "confidence": 0.5}"#))
            .classify_raw("t", "o", 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, CortexError::ClassificationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let err = strategy(Err("connection refused"))
            .classify_raw("t", "o", 0.5)
            .await
            .unwrap_err();
        match err {
            CortexError::ClassificationUnavailable(msg) => assert!(msg.contains("connection refused")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
