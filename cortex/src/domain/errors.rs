// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Error Taxonomy
//!
//! [`CortexError`] is what every public operation returns. Backend and
//! persistence failures are retryable by the caller; the remaining variants
//! are programming errors that must be fixed at the call site.
//!
//! [`StoreError`] is the repository-level error, mapped into
//! [`CortexError::StoreUnavailable`] (or a more specific variant) by the
//! application services.

use std::time::Duration;

use super::classification::Outcome;

/// Errors surfaced by the pattern memory core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CortexError {
    #[error("Classification backend unavailable: {0}")]
    ClassificationUnavailable(String),

    #[error("Classification timed out after {0:?}")]
    ClassificationTimeout(Duration),

    #[error("Classification cancelled by caller")]
    Cancelled,

    #[error("Pattern store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Invalid link direction: {source_name} -> {target_name} ({detail})")]
    InvalidLinkDirection {
        source_name: String,
        target_name: String,
        detail: String,
    },

    #[error("Pattern '{name}' is classified {existing}, refusing {attempted} observation")]
    ClassificationConflict {
        name: String,
        existing: Outcome,
        attempted: Outcome,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CortexError {
    /// Whether a caller may retry the same request with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CortexError::ClassificationUnavailable(_)
                | CortexError::ClassificationTimeout(_)
                | CortexError::StoreUnavailable(_)
        )
    }

    /// Stable snake_case identifier, used in HTTP error bodies and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            CortexError::ClassificationUnavailable(_) => "classification_unavailable",
            CortexError::ClassificationTimeout(_) => "classification_timeout",
            CortexError::Cancelled => "cancelled",
            CortexError::StoreUnavailable(_) => "store_unavailable",
            CortexError::PatternNotFound(_) => "pattern_not_found",
            CortexError::InvalidLinkDirection { .. } => "invalid_link_direction",
            CortexError::ClassificationConflict { .. } => "classification_conflict",
            CortexError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

/// Repository errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Optimistic revision check failed, or a unique key already exists
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<StoreError> for CortexError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => CortexError::PatternNotFound(name),
            other => CortexError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_split() {
        assert!(CortexError::ClassificationUnavailable("down".into()).is_retryable());
        assert!(CortexError::ClassificationTimeout(Duration::from_secs(1)).is_retryable());
        assert!(CortexError::StoreUnavailable("down".into()).is_retryable());

        assert!(!CortexError::Cancelled.is_retryable());
        assert!(!CortexError::PatternNotFound("x".into()).is_retryable());
        assert!(!CortexError::InvalidArgument("limit".into()).is_retryable());
        assert!(!CortexError::InvalidLinkDirection {
            source_name: "a".into(),
            target_name: "b".into(),
            detail: "source is FAILURE".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_store_error_mapping() {
        let err: CortexError = StoreError::Database("connection refused".into()).into();
        assert_eq!(err.kind(), "store_unavailable");

        let err: CortexError = StoreError::NotFound("GoodPrompt".into()).into();
        assert_eq!(err, CortexError::PatternNotFound("GoodPrompt".into()));
    }
}
