//! Runtime feature-flag seam
//!
//! Filters query a [`RuntimeFlags`] implementation once per stream so an
//! operator can disable a filter at runtime without redeploying
//! configuration. The query is keyed by a per-filter name such as
//! `http.compressor.filter_enabled`.

use std::collections::HashMap;

/// Boolean-returning runtime queries, keyed by configuration name
pub trait RuntimeFlags: Send + Sync + std::fmt::Debug {
    /// Returns whether the named feature is enabled, falling back to
    /// `default_value` when the key is unknown
    fn feature_enabled(&self, key: &str, default_value: bool) -> bool;
}

/// A [`RuntimeFlags`] that answers `true` for every key
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysEnabled;

impl RuntimeFlags for AlwaysEnabled {
    fn feature_enabled(&self, _key: &str, _default_value: bool) -> bool {
        true
    }
}

/// A fixed flag table, useful for tests and static deployments
#[derive(Debug, Clone, Default)]
pub struct StaticFlags {
    flags: HashMap<String, bool>,
}

impl StaticFlags {
    /// Create an empty flag table; unknown keys resolve to the default
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a flag value
    pub fn set(mut self, key: impl Into<String>, enabled: bool) -> Self {
        self.flags.insert(key.into(), enabled);
        self
    }
}

impl RuntimeFlags for StaticFlags {
    fn feature_enabled(&self, key: &str, default_value: bool) -> bool {
        self.flags.get(key).copied().unwrap_or(default_value)
    }
}
