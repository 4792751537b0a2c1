//! # Remora Core
//!
//! Foundational types shared by the remora proxy filter crates:
//! - Error types and result alias
//! - Middleware trait and chain
//! - Runtime feature-flag seam
//!
//! Per-filter behavior lives in the filter crates; this crate only carries
//! the seams those filters plug into.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod middleware;
pub mod runtime;

pub use error::{Error, Result};
pub use middleware::{Body, Middleware, Next};
pub use runtime::{AlwaysEnabled, RuntimeFlags, StaticFlags};

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{Request, Response, StatusCode};
