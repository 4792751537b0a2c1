//! Codec capability interfaces
//!
//! A [`Compressor`] is the per-stream transform: stateful, fed raw bytes in
//! arbitrary chunks, finalized exactly once. A [`CompressorFactory`] binds
//! backend tuning at configuration time and hands out a fresh instance per
//! stream. The filter never branches on which backend is active; everything
//! backend-specific stays behind these two traits.

use bytes::Bytes;
use remora_core::Result;
use std::fmt;

/// Stateful per-stream compression transform
///
/// Implementations must be streaming-equivalent: feeding a body in any
/// chunking and concatenating the outputs (including the [`finish`] output)
/// yields bytes identical to feeding the whole body at once.
///
/// [`finish`]: Compressor::finish
pub trait Compressor: Send {
    /// Accept a chunk of raw bytes and return whatever compressed bytes the
    /// codec emits for it
    ///
    /// The returned buffer may be empty when the codec buffers internally.
    /// An error is fatal to this stream only; the instance must not be used
    /// afterwards.
    fn feed(&mut self, chunk: &[u8]) -> Result<Bytes>;

    /// Flush all remaining codec state and append the format trailer
    ///
    /// Consumes the compressor; called exactly once, after the last chunk.
    fn finish(self: Box<Self>) -> Result<Bytes>;
}

/// Produces a fresh [`Compressor`] per stream
///
/// Tuning parameters are bound when the factory is constructed, never per
/// call. Concurrent calls from different streams must not share mutable
/// state.
pub trait CompressorFactory: Send + Sync + fmt::Debug {
    /// Create a new, independently-stateful compressor
    fn create_compressor(&self) -> Box<dyn Compressor>;

    /// The content-encoding token this backend advertises (e.g. `"gzip"`)
    fn content_encoding(&self) -> &'static str;
}
