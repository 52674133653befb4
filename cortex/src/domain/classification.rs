// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Classification inputs and outputs
//!
//! A [`TaskResult`] is what a mission runner hands us after a task finished.
//! A [`ClassificationStrategy`] turns it into a [`RawClassification`], and the
//! classifier completes that into a [`Classification`] carrying the derived
//! pattern name.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Value objects for the classify step and the strategy seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::errors::CortexError;

/// Metadata key carrying the optional domain tag of a task result
pub const DOMAIN_METADATA_KEY: &str = "domain";

/// Metadata key naming a pattern the new observation should be linked with
pub const LINK_WITH_METADATA_KEY: &str = "link_with";

/// Outcome label of a classified observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
        }
    }

    /// Lower-case prefix used in derived pattern names
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }

    pub fn opposite(&self) -> Outcome {
        match self {
            Outcome::Success => Outcome::Failure,
            Outcome::Failure => Outcome::Success,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Outcome::Success),
            "failure" => Ok(Outcome::Failure),
            other => Err(CortexError::InvalidArgument(format!(
                "unknown classification '{}', expected SUCCESS or FAILURE",
                other
            ))),
        }
    }
}

/// Structured result of a finished task, as submitted by callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: String,
    #[serde(default)]
    pub output: String,
    /// Caller-supplied quality score in [0, 1]
    pub quality_score: f64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl TaskResult {
    pub fn new(task: impl Into<String>, output: impl Into<String>, quality_score: f64) -> Self {
        Self {
            task: task.into(),
            output: output.into(),
            quality_score,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Domain tag carried in `metadata["domain"]`, if it is a non-empty string
    pub fn domain(&self) -> Option<&str> {
        self.metadata_str(DOMAIN_METADATA_KEY)
    }

    /// Explicit link target carried in `metadata["link_with"]`
    pub fn link_with(&self) -> Option<&str> {
        self.metadata_str(LINK_WITH_METADATA_KEY)
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Reject inputs no strategy can classify meaningfully
    pub fn validate(&self) -> Result<(), CortexError> {
        if self.task.trim().is_empty() {
            return Err(CortexError::InvalidArgument("task cannot be empty".to_string()));
        }
        if !self.quality_score.is_finite() || !(0.0..=1.0).contains(&self.quality_score) {
            return Err(CortexError::InvalidArgument(format!(
                "quality_score must be within [0, 1], got {}",
                self.quality_score
            )));
        }
        Ok(())
    }
}

/// What a strategy returns before naming and validation
#[derive(Debug, Clone, PartialEq)]
pub struct RawClassification {
    pub label: Outcome,
    pub reason: String,
    pub confidence: f64,
    /// Optional short semantic label used for pattern naming instead of the task text
    pub summary: Option<String>,
}

/// Completed classification, ready to be upserted into the pattern store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub classification: Outcome,
    pub reason: String,
    pub pattern_name: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl Classification {
    pub fn new(
        pattern_name: impl Into<String>,
        classification: Outcome,
        reason: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            classification,
            reason: reason.into(),
            pattern_name: pattern_name.into(),
            confidence,
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Pluggable labelling logic (rule-based or model-backed)
///
/// Implementations are selected at construction time and injected into the
/// classifier. Backend failures must surface as
/// [`CortexError::ClassificationUnavailable`]; strategies never guess.
#[async_trait]
pub trait ClassificationStrategy: Send + Sync {
    /// Short identifier used in logs and metrics
    fn name(&self) -> &'static str;

    async fn classify_raw(
        &self,
        task: &str,
        output: &str,
        quality_score: f64,
    ) -> Result<RawClassification, CortexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parsing() {
        assert_eq!("SUCCESS".parse::<Outcome>().unwrap(), Outcome::Success);
        assert_eq!(" failure ".parse::<Outcome>().unwrap(), Outcome::Failure);
        assert!("maybe".parse::<Outcome>().is_err());
        assert_eq!(Outcome::Success.opposite(), Outcome::Failure);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::Failure).unwrap();
        assert_eq!(json, "\"FAILURE\"");
    }

    #[test]
    fn test_task_result_validation() {
        assert!(TaskResult::new("summarize article", "ok", 0.92).validate().is_ok());
        assert!(TaskResult::new("  ", "ok", 0.5).validate().is_err());
        assert!(TaskResult::new("t", "ok", 1.5).validate().is_err());
        assert!(TaskResult::new("t", "ok", f64::NAN).validate().is_err());
    }

    #[test]
    fn test_metadata_accessors() {
        let result = TaskResult::new("scrape", "", 0.3)
            .with_metadata("domain", "osint")
            .with_metadata("link_with", "  ")
            .with_metadata("attempt", 2);

        assert_eq!(result.domain(), Some("osint"));
        assert_eq!(result.link_with(), None);
    }
}
