// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Property tests: naming stability, idempotent upsert, classification
//! immutability, link direction, decay monotonicity, query ordering.

use chrono::{Duration as ChronoDuration, Utc};
use proptest::prelude::*;
use std::time::Duration;

use pattern_memory_cortex::application::{CortexRuntime, Learner};
use pattern_memory_cortex::{
    counterpart_name, derive_pattern_name, Classification, CortexError, Outcome, TaskResult,
};

const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Success), Just(Outcome::Failure)]
}

proptest! {
    #[test]
    fn prop_names_are_deterministic_and_paired(
        task in "[a-zA-Z0-9 ,.'/-]{1,80}",
        label in outcome(),
    ) {
        let a = derive_pattern_name(label, &task);
        let b = derive_pattern_name(label, &format!("  {}  ", task.to_uppercase()));
        prop_assert_eq!(&a, &b);

        let opposite = derive_pattern_name(label.opposite(), &task);
        prop_assert_ne!(&a, &opposite);
        prop_assert_eq!(counterpart_name(&a), Some(opposite));
    }

    #[test]
    fn prop_learning_twice_is_idempotent_by_name(
        task in "[a-z]{3,12}( [a-z]{3,12}){0,4}",
        score in 0.0f64..=1.0,
    ) {
        let runtime = CortexRuntime::in_memory();
        let result = TaskResult::new(task, "output", score);

        let (first, second, total) = block_on(async {
            let first = runtime.learning.learn_from_result(&result).await.unwrap();
            let second = runtime.learning.learn_from_result(&result).await.unwrap();
            let total = runtime.query.get_stats().await.unwrap().total;
            (first, second, total)
        });

        prop_assert_eq!(first.pattern_name, second.pattern_name);
        prop_assert_eq!(second.occurrences, Some(2));
        prop_assert_eq!(total, 1);
    }

    #[test]
    fn prop_classification_never_flips(
        name in "[a-z]{1,10}",
        label in outcome(),
        confidence in 0.0f64..=1.0,
    ) {
        let runtime = CortexRuntime::in_memory();
        let (conflict, stored) = block_on(async {
            runtime
                .store
                .upsert(&Classification::new(name.clone(), label, "first", confidence))
                .await
                .unwrap();
            let conflict = runtime
                .store
                .upsert(&Classification::new(name.clone(), label.opposite(), "second", confidence))
                .await;
            (conflict, runtime.query.get_pattern(&name).await.unwrap())
        });

        let is_conflict = matches!(conflict, Err(CortexError::ClassificationConflict { .. }));
        prop_assert!(is_conflict);
        prop_assert_eq!(stored.classification, label);
        prop_assert_eq!(stored.occurrences, 1);
    }

    #[test]
    fn prop_links_only_point_success_to_failure(a in outcome(), b in outcome()) {
        let runtime = CortexRuntime::in_memory();
        let result = block_on(async {
            runtime.store.upsert(&Classification::new("a", a, "r", 0.5)).await.unwrap();
            runtime.store.upsert(&Classification::new("b", b, "r", 0.5)).await.unwrap();
            runtime.links.link_default("a", "b").await
        });

        if a == Outcome::Success && b == Outcome::Failure {
            prop_assert!(result.is_ok());
        } else {
            let is_direction_error = matches!(result, Err(CortexError::InvalidLinkDirection { .. }));
            prop_assert!(is_direction_error);
        }
    }

    #[test]
    fn prop_decay_removes_exactly_one_occurrence(
        occurrences in 0u64..20,
        age_days in 8i64..400,
    ) {
        let runtime = CortexRuntime::in_memory();
        let seen = Utc::now() - ChronoDuration::days(age_days);
        let after = block_on(async {
            let classification = Classification::new("p", Outcome::Success, "r", 0.5);
            for _ in 0..occurrences.max(1) {
                runtime.store.upsert_at(&classification, seen).await.unwrap();
            }
            if occurrences == 0 {
                runtime.decay.decay(Utc::now(), WEEK).await.unwrap();
            }
            runtime.decay.decay(Utc::now(), WEEK).await.unwrap();
            runtime.query.get_pattern("p").await.unwrap().occurrences
        });

        prop_assert_eq!(after, occurrences.saturating_sub(1));
    }

    #[test]
    fn prop_best_practices_are_ordered(
        counts in prop::collection::vec((1u64..8, 0.0f64..=1.0), 1..12),
        limit in 1usize..15,
    ) {
        let runtime = CortexRuntime::in_memory();
        let results = block_on(async {
            for (i, (count, confidence)) in counts.iter().enumerate() {
                let c = Classification::new(format!("success:p{}:{}", i, i), Outcome::Success, "r", *confidence);
                for _ in 0..*count {
                    runtime.store.upsert(&c).await.unwrap();
                }
            }
            runtime.query.get_best_practices(None, Outcome::Success, limit).await.unwrap()
        });

        prop_assert_eq!(results.len(), limit.min(counts.len()));
        for pair in results.windows(2) {
            prop_assert!(pair[0].occurrences >= pair[1].occurrences);
            if pair[0].occurrences == pair[1].occurrences {
                prop_assert!(pair[0].confidence >= pair[1].confidence);
            }
        }
    }
}
