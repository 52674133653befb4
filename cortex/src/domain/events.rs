// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the pattern memory
//! Published on the event bus for notifiers and reporting collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classification::Outcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CortexEvent {
    /// First observation of a pattern name
    PatternCreated {
        name: String,
        classification: Outcome,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// Repeat observation merged into an existing pattern
    PatternReinforced {
        name: String,
        occurrences: u64,
        old_confidence: f64,
        new_confidence: f64,
        timestamp: DateTime<Utc>,
    },

    LinkCreated {
        source: String,
        target: String,
        strength: f64,
        timestamp: DateTime<Utc>,
    },

    LinkReinforced {
        source: String,
        target: String,
        old_strength: f64,
        new_strength: f64,
        timestamp: DateTime<Utc>,
    },

    /// One occurrence forgotten by the decay engine
    PatternDecayed {
        name: String,
        occurrences: u64,
        links_weakened: usize,
        timestamp: DateTime<Utc>,
    },

    /// Occurrences reached zero; the pattern leaves default query results
    PatternDormant {
        name: String,
        timestamp: DateTime<Utc>,
    },

    DecayCompleted {
        patterns_decayed: usize,
        links_weakened: usize,
        newly_dormant: usize,
        skipped: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl CortexEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CortexEvent::PatternCreated { timestamp, .. } => *timestamp,
            CortexEvent::PatternReinforced { timestamp, .. } => *timestamp,
            CortexEvent::LinkCreated { timestamp, .. } => *timestamp,
            CortexEvent::LinkReinforced { timestamp, .. } => *timestamp,
            CortexEvent::PatternDecayed { timestamp, .. } => *timestamp,
            CortexEvent::PatternDormant { timestamp, .. } => *timestamp,
            CortexEvent::DecayCompleted { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            CortexEvent::PatternCreated { .. } => "pattern_created",
            CortexEvent::PatternReinforced { .. } => "pattern_reinforced",
            CortexEvent::LinkCreated { .. } => "link_created",
            CortexEvent::LinkReinforced { .. } => "link_reinforced",
            CortexEvent::PatternDecayed { .. } => "pattern_decayed",
            CortexEvent::PatternDormant { .. } => "pattern_dormant",
            CortexEvent::DecayCompleted { .. } => "decay_completed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = CortexEvent::PatternCreated {
            name: "success:summarize-article:1a2b3c4d".to_string(),
            classification: Outcome::Success,
            confidence: 0.9,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pattern_created");
        assert_eq!(json["classification"], "SUCCESS");

        let deserialized: CortexEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event, deserialized);
    }
}
