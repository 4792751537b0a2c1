//! In-process atomic counter store

use crate::StatsRecorder;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Concurrent counter store backed by atomics
///
/// Counters are created on first increment. Reads and writes use relaxed
/// ordering; counters are independent and never read-modify-written
/// together.
#[derive(Debug, Default)]
pub struct StatsStore {
    counters: DashMap<String, AtomicU64>,
}

impl StatsStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the named counter, zero if never incremented
    pub fn counter_value(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Names of all counters touched so far
    pub fn counter_names(&self) -> Vec<String> {
        self.counters.iter().map(|c| c.key().clone()).collect()
    }
}

impl StatsRecorder for StatsStore {
    fn increment(&self, name: &str, delta: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
    }
}
