//! # Remora Stats
//!
//! Counter recording for remora filters. Filters publish named counter
//! increments through the [`StatsRecorder`] trait; the concrete sink is a
//! deployment concern. [`StatsStore`] is the in-process implementation:
//! lock-free atomic counters keyed by name, safe for concurrent increment
//! from many streams.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod store;

pub use store::StatsStore;

/// Receives counter increments from filters
///
/// Implementations must support concurrent increments from many streams.
pub trait StatsRecorder: Send + Sync + std::fmt::Debug {
    /// Add `delta` to the counter registered under `name`, creating it at
    /// zero if it does not exist yet
    fn increment(&self, name: &str, delta: u64);
}
