//! Per-stream compression state machine
//!
//! One [`CompressorFilter`] exists per in-flight message. It makes the
//! compress/passthrough decision once from headers, owns the per-stream
//! compressor, drives the chunk loop, and publishes byte accounting when
//! the stream finishes. The filter is exclusively owned by its stream's
//! execution context; only the shared [`FilterConfig`] and the stats
//! recorder are touched concurrently.

use crate::compressor::Compressor;
use crate::config::FilterConfig;
use bytes::BytesMut;
use http::{header, HeaderMap, HeaderValue};
use remora_core::{Error, Result};
use remora_stats::StatsRecorder;
use std::sync::Arc;
use tracing::debug;

/// The header-time compression decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Headers not seen yet
    Undecided,
    /// Forward body bytes unchanged
    Passthrough,
    /// Transform body bytes through the owned compressor
    Compressing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Idle,
    Streaming,
    Finished,
    Aborted,
}

/// Streaming compression filter for one message exchange
pub struct CompressorFilter {
    config: Arc<FilterConfig>,
    stats: Arc<dyn StatsRecorder>,
    state: StreamState,
    decision: Decision,
    compressor: Option<Box<dyn Compressor>>,
    uncompressed_bytes: u64,
    compressed_bytes: u64,
}

impl CompressorFilter {
    /// Create a filter for a new stream served by `config`
    pub fn new(config: Arc<FilterConfig>, stats: Arc<dyn StatsRecorder>) -> Self {
        Self {
            config,
            stats,
            state: StreamState::Idle,
            decision: Decision::Undecided,
            compressor: None,
            uncompressed_bytes: 0,
            compressed_bytes: 0,
        }
    }

    /// The decision made at header time; set exactly once
    pub fn decision(&self) -> Decision {
        self.decision
    }

    /// Raw bytes fed to the compressor so far
    pub fn uncompressed_bytes(&self) -> u64 {
        self.uncompressed_bytes
    }

    /// Compressed bytes emitted so far, including the trailer once finished
    pub fn compressed_bytes(&self) -> u64 {
        self.compressed_bytes
    }

    /// Whether the stream reached its terminal chunk
    pub fn is_finished(&self) -> bool {
        self.state == StreamState::Finished
    }

    /// Evaluate the decision policy against the arrived headers
    ///
    /// Called exactly once, before any body chunk. When the decision is to
    /// compress, the outgoing `content-encoding` is rewritten to the
    /// advertised token and `content-length` is removed (the length of a
    /// compressed stream is not known in advance; framing is the header
    /// map owner's concern). `end_stream` marks a message with no body,
    /// which finishes immediately untouched.
    pub fn on_response_headers(
        &mut self,
        request_headers: &HeaderMap,
        response_headers: &mut HeaderMap,
        end_stream: bool,
    ) -> Result<Decision> {
        if self.state != StreamState::Idle {
            return Err(Error::Internal(format!(
                "headers on a stream in state {:?}",
                self.state
            )));
        }

        if end_stream {
            self.decision = Decision::Passthrough;
            self.state = StreamState::Finished;
            return Ok(Decision::Passthrough);
        }

        let decision = if self.config.should_compress(request_headers, response_headers) {
            self.compressor = Some(self.config.create_compressor());
            response_headers.insert(
                header::CONTENT_ENCODING,
                HeaderValue::from_static(self.config.content_encoding()),
            );
            response_headers.remove(header::CONTENT_LENGTH);
            Decision::Compressing
        } else {
            Decision::Passthrough
        };

        debug!(
            encoding = self.config.content_encoding(),
            ?decision,
            "compression decision made"
        );
        self.decision = decision;
        self.state = StreamState::Streaming;
        Ok(decision)
    }

    /// Process one body chunk in place
    ///
    /// `end_stream` flags the terminal chunk of the message; a message with
    /// no body chunks must still deliver one empty terminal chunk so the
    /// compressor is always finalized. Compressed replacement output may be
    /// empty when the codec buffers internally.
    pub fn on_body_chunk(&mut self, data: &mut BytesMut, end_stream: bool) -> Result<()> {
        match self.state {
            StreamState::Streaming => {}
            StreamState::Idle => {
                return Err(Error::Internal("body chunk before headers".to_string()))
            }
            StreamState::Finished => {
                return Err(Error::Internal(
                    "body chunk after stream finished".to_string(),
                ))
            }
            StreamState::Aborted => {
                return Err(Error::Internal("body chunk on aborted stream".to_string()))
            }
        }

        match self.decision {
            Decision::Undecided => Err(Error::Internal(
                "streaming without a header-time decision".to_string(),
            )),
            Decision::Passthrough => {
                if end_stream {
                    self.state = StreamState::Finished;
                }
                Ok(())
            }
            Decision::Compressing => self.compress_chunk(data, end_stream),
        }
    }

    fn compress_chunk(&mut self, data: &mut BytesMut, end_stream: bool) -> Result<()> {
        // Counted before the transform so a codec failure cannot skew what
        // was actually seen; counters are only published at Finished.
        self.uncompressed_bytes += data.len() as u64;

        let compressor = self
            .compressor
            .as_mut()
            .ok_or_else(|| Error::Internal("compressing stream without compressor".to_string()))?;

        let emitted = match compressor.feed(data) {
            Ok(emitted) => emitted,
            Err(e) => return Err(self.fail_stream(e)),
        };
        self.compressed_bytes += emitted.len() as u64;
        data.clear();
        data.extend_from_slice(&emitted);

        if end_stream {
            let compressor = self.compressor.take().ok_or_else(|| {
                Error::Internal("compressing stream without compressor".to_string())
            })?;
            let trailer = match compressor.finish() {
                Ok(trailer) => trailer,
                Err(e) => return Err(self.fail_stream(e)),
            };
            self.compressed_bytes += trailer.len() as u64;
            data.extend_from_slice(&trailer);
            self.state = StreamState::Finished;
            self.publish_stats();
        }

        Ok(())
    }

    /// Drop the stream without finalizing
    ///
    /// The compressor is discarded without `finish` and nothing is
    /// published; an aborted stream contributes no counters.
    pub fn abort(&mut self) {
        if self.state != StreamState::Finished {
            self.compressor = None;
            self.state = StreamState::Aborted;
        }
    }

    fn fail_stream(&mut self, error: Error) -> Error {
        self.compressor = None;
        self.state = StreamState::Aborted;
        error
    }

    fn publish_stats(&self) {
        let prefix = self.config.stats_prefix();
        let token = self.config.content_encoding();
        self.stats.increment(
            &format!("{prefix}.{token}.total_uncompressed_bytes"),
            self.uncompressed_bytes,
        );
        self.stats.increment(
            &format!("{prefix}.{token}.total_compressed_bytes"),
            self.compressed_bytes,
        );
        self.stats.increment(&format!("{prefix}.{token}.compressed"), 1);
        debug!(
            encoding = token,
            uncompressed = self.uncompressed_bytes,
            compressed = self.compressed_bytes,
            "stream compressed"
        );
    }
}

impl std::fmt::Debug for CompressorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressorFilter")
            .field("state", &self.state)
            .field("uncompressed_bytes", &self.uncompressed_bytes)
            .field("compressed_bytes", &self.compressed_bytes)
            .finish()
    }
}
