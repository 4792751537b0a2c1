//! DEFLATE-family backend built on flate2
//!
//! Each stream owns a `GzEncoder` writing into a private `Vec<u8>`. The
//! encoder only ever appends, so an emitted-bytes watermark is enough to
//! hand back exactly the bytes produced by each call.

use crate::compressor::{Compressor, CompressorFactory};
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use remora_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// zlib window size range (window bits)
const WINDOW_BITS_RANGE: std::ops::RangeInclusive<u32> = 9..=15;
/// zlib internal state memory range
const MEMORY_LEVEL_RANGE: std::ops::RangeInclusive<u32> = 1..=9;

/// Compression effort presets, mirroring zlib's named levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GzipLevel {
    /// Fastest, lowest ratio (zlib level 1)
    Speed,
    /// Balanced default (zlib level 6)
    Standard,
    /// Highest ratio, slowest (zlib level 9)
    Best,
}

impl Default for GzipLevel {
    fn default() -> Self {
        Self::Standard
    }
}

impl GzipLevel {
    fn to_flate2(self) -> Compression {
        match self {
            Self::Speed => Compression::fast(),
            Self::Standard => Compression::default(),
            Self::Best => Compression::best(),
        }
    }
}

/// Gzip backend tuning, bound at configuration time
///
/// `window_bits` and `memory_level` are validated against zlib's ranges at
/// factory construction. The bundled miniz backend fixes its window at
/// 32 KiB, so out-of-range values are a configuration error rather than a
/// runtime knob.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GzipParams {
    /// Compression effort
    #[serde(default)]
    pub level: GzipLevel,
    /// LZ77 window size as window bits, 9..=15
    #[serde(default = "default_window_bits")]
    pub window_bits: u32,
    /// Internal state memory level, 1..=9
    #[serde(default = "default_memory_level")]
    pub memory_level: u32,
}

fn default_window_bits() -> u32 {
    12
}

fn default_memory_level() -> u32 {
    5
}

impl Default for GzipParams {
    fn default() -> Self {
        Self {
            level: GzipLevel::default(),
            window_bits: default_window_bits(),
            memory_level: default_memory_level(),
        }
    }
}

impl GzipParams {
    fn validate(&self) -> Result<()> {
        if !WINDOW_BITS_RANGE.contains(&self.window_bits) {
            return Err(Error::Config(format!(
                "gzip window_bits {} out of range {:?}",
                self.window_bits, WINDOW_BITS_RANGE
            )));
        }
        if !MEMORY_LEVEL_RANGE.contains(&self.memory_level) {
            return Err(Error::Config(format!(
                "gzip memory_level {} out of range {:?}",
                self.memory_level, MEMORY_LEVEL_RANGE
            )));
        }
        Ok(())
    }
}

/// Factory for per-stream gzip compressors
#[derive(Debug)]
pub struct GzipCompressorFactory {
    params: GzipParams,
}

impl GzipCompressorFactory {
    /// Validate `params` and bind them for all streams of this factory
    pub fn new(params: GzipParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl CompressorFactory for GzipCompressorFactory {
    fn create_compressor(&self) -> Box<dyn Compressor> {
        Box::new(GzipCompressor {
            encoder: GzEncoder::new(Vec::new(), self.params.level.to_flate2()),
            emitted: 0,
        })
    }

    fn content_encoding(&self) -> &'static str {
        "gzip"
    }
}

struct GzipCompressor {
    encoder: GzEncoder<Vec<u8>>,
    // Bytes of the output buffer already handed back to the caller
    emitted: usize,
}

impl Compressor for GzipCompressor {
    fn feed(&mut self, chunk: &[u8]) -> Result<Bytes> {
        self.encoder
            .write_all(chunk)
            .map_err(|e| Error::Codec(format!("gzip deflate failed: {e}")))?;
        let out = self.encoder.get_ref();
        let fresh = Bytes::copy_from_slice(&out[self.emitted..]);
        self.emitted = out.len();
        Ok(fresh)
    }

    fn finish(self: Box<Self>) -> Result<Bytes> {
        let watermark = self.emitted;
        let out = self
            .encoder
            .finish()
            .map_err(|e| Error::Codec(format!("gzip finish failed: {e}")))?;
        Ok(Bytes::copy_from_slice(&out[watermark..]))
    }
}
