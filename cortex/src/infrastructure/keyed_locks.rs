// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-name async locks
//!
//! Serialises read-modify-write cycles on a single pattern name (or a pair of
//! names for a link) without blocking unrelated names. Entries are removed
//! once the last guard for a name is dropped.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held lock on one name
pub struct KeyGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release the mutex before checking whether anyone else still holds the Arc
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Held locks on two names, acquired in lexicographic order
pub struct PairGuard {
    _first: KeyGuard,
    _second: Option<KeyGuard>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Lock two names in a canonical order so concurrent link updates never deadlock
    pub async fn lock_pair(&self, a: &str, b: &str) -> PairGuard {
        if a == b {
            return PairGuard {
                _first: self.lock(a).await,
                _second: None,
            };
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first).await;
        let second = self.lock(second).await;
        PairGuard {
            _first: first,
            _second: Some(second),
        }
    }

    /// Number of names currently locked or waited on
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}
