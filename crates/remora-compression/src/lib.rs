//! Body-compression filter for the remora proxy
//!
//! Compresses response bodies as they stream through the proxy:
//! - Accept-Encoding negotiation with q-values
//! - An irrevocable compress/passthrough decision made from headers
//! - Chunk-by-chunk encoding with bounded per-call memory
//! - Pluggable codec backends (gzip, zstd) behind one capability interface
//! - Exact per-stream byte accounting published to a stats recorder
//!
//! The streaming core is [`filter::CompressorFilter`]; servers that buffer
//! whole bodies can use [`middleware::CompressionMiddleware`] instead.

pub mod compressor;
pub mod config;
pub mod filter;
pub mod gzip;
pub mod middleware;
pub mod zstd;

pub use compressor::{Compressor, CompressorFactory};
pub use config::{CompressionSettings, FilterConfig};
pub use filter::{CompressorFilter, Decision};
pub use gzip::{GzipCompressorFactory, GzipLevel, GzipParams};
pub use middleware::CompressionMiddleware;
pub use zstd::{ZstdCompressorFactory, ZstdParams};
