//! Zstandard backend
//!
//! Same emitted-bytes watermark pattern as the gzip backend, over
//! `zstd::stream::write::Encoder`. Checksum and an optional shared
//! dictionary are bound at factory construction; the dictionary is loaded
//! into every per-stream encoder.

use crate::compressor::{Compressor, CompressorFactory};
use bytes::Bytes;
use remora_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use ::zstd::stream::write::Encoder;

/// Supported zstd level range; 1 is fastest, 22 is strongest
const LEVEL_RANGE: std::ops::RangeInclusive<i32> = 1..=22;

/// Zstd backend tuning, bound at configuration time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZstdParams {
    /// Compression level, 1..=22
    #[serde(default = "default_level")]
    pub level: i32,
    /// Append a content checksum to each frame
    #[serde(default)]
    pub enable_checksum: bool,
}

fn default_level() -> i32 {
    3
}

impl Default for ZstdParams {
    fn default() -> Self {
        Self {
            level: default_level(),
            enable_checksum: false,
        }
    }
}

impl ZstdParams {
    fn validate(&self) -> Result<()> {
        if !LEVEL_RANGE.contains(&self.level) {
            return Err(Error::Config(format!(
                "zstd level {} out of range {:?}",
                self.level, LEVEL_RANGE
            )));
        }
        Ok(())
    }
}

/// Factory for per-stream zstd compressors
#[derive(Debug)]
pub struct ZstdCompressorFactory {
    params: ZstdParams,
    dictionary: Option<Vec<u8>>,
}

impl ZstdCompressorFactory {
    /// Validate `params` and bind them for all streams of this factory
    pub fn new(params: ZstdParams) -> Result<Self> {
        Self::with_dictionary(params, None)
    }

    /// Like [`new`](Self::new), with a shared dictionary loaded into every
    /// per-stream encoder
    pub fn with_dictionary(params: ZstdParams, dictionary: Option<Vec<u8>>) -> Result<Self> {
        params.validate()?;
        let factory = Self { params, dictionary };
        // Surface encoder-construction failures (e.g. a malformed
        // dictionary) at configuration load, not mid-stream.
        factory
            .build_encoder()
            .map_err(|e| Error::Config(format!("zstd encoder rejected parameters: {e}")))?;
        Ok(factory)
    }

    fn build_encoder(&self) -> std::io::Result<Encoder<'static, Vec<u8>>> {
        let mut encoder = match &self.dictionary {
            Some(dict) => Encoder::with_dictionary(Vec::new(), self.params.level, dict)?,
            None => Encoder::new(Vec::new(), self.params.level)?,
        };
        encoder.include_checksum(self.params.enable_checksum)?;
        Ok(encoder)
    }
}

impl CompressorFactory for ZstdCompressorFactory {
    fn create_compressor(&self) -> Box<dyn Compressor> {
        // Construction was proven sound when the factory was built; a
        // failure here can only be a resource problem, surfaced to the
        // stream on first use.
        let inner = self.build_encoder().map_err(|e| e.to_string());
        Box::new(ZstdCompressor { inner, emitted: 0 })
    }

    fn content_encoding(&self) -> &'static str {
        "zstd"
    }
}

struct ZstdCompressor {
    inner: std::result::Result<Encoder<'static, Vec<u8>>, String>,
    emitted: usize,
}

impl Compressor for ZstdCompressor {
    fn feed(&mut self, chunk: &[u8]) -> Result<Bytes> {
        let encoder = self
            .inner
            .as_mut()
            .map_err(|e| Error::Codec(format!("zstd encoder unavailable: {e}")))?;
        encoder
            .write_all(chunk)
            .map_err(|e| Error::Codec(format!("zstd compress failed: {e}")))?;
        let out = encoder.get_ref();
        let fresh = Bytes::copy_from_slice(&out[self.emitted..]);
        self.emitted = out.len();
        Ok(fresh)
    }

    fn finish(self: Box<Self>) -> Result<Bytes> {
        let encoder = self
            .inner
            .map_err(|e| Error::Codec(format!("zstd encoder unavailable: {e}")))?;
        let watermark = self.emitted;
        let out = encoder
            .finish()
            .map_err(|e| Error::Codec(format!("zstd finish failed: {e}")))?;
        Ok(Bytes::copy_from_slice(&out[watermark..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        assert!(ZstdCompressorFactory::new(ZstdParams::default()).is_ok());

        let bad_level = ZstdParams {
            level: 23,
            ..ZstdParams::default()
        };
        assert!(matches!(
            ZstdCompressorFactory::new(bad_level),
            Err(Error::Config(_))
        ));

        let zero_level = ZstdParams {
            level: 0,
            ..ZstdParams::default()
        };
        assert!(matches!(
            ZstdCompressorFactory::new(zero_level),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let factory = ZstdCompressorFactory::new(ZstdParams::default()).unwrap();
        let data = b"zstandard round trip payload ".repeat(1024);

        let mut compressor = factory.create_compressor();
        let mut out = Vec::new();
        out.extend_from_slice(&compressor.feed(&data).unwrap());
        out.extend_from_slice(&compressor.finish().unwrap());

        assert!(out.len() < data.len());
        assert_eq!(::zstd::decode_all(out.as_slice()).unwrap(), data);
    }

    #[test]
    fn test_streaming_equivalence() {
        let factory = ZstdCompressorFactory::new(ZstdParams::default()).unwrap();
        let data = b"0123456789abcdef".repeat(2048);

        let mut whole = factory.create_compressor();
        let mut whole_out = Vec::new();
        whole_out.extend_from_slice(&whole.feed(&data).unwrap());
        whole_out.extend_from_slice(&whole.finish().unwrap());

        let mut chunked = factory.create_compressor();
        let mut chunked_out = Vec::new();
        for chunk in data.chunks(503) {
            chunked_out.extend_from_slice(&chunked.feed(chunk).unwrap());
        }
        chunked_out.extend_from_slice(&chunked.finish().unwrap());

        assert_eq!(whole_out, chunked_out);
    }

    #[test]
    fn test_checksum_changes_frame() {
        let data = b"checksummed payload ".repeat(256);

        let plain = ZstdCompressorFactory::new(ZstdParams::default()).unwrap();
        let mut c = plain.create_compressor();
        let mut plain_out: Vec<u8> = c.feed(&data).unwrap().to_vec();
        plain_out.extend_from_slice(&c.finish().unwrap());

        let checked = ZstdCompressorFactory::new(ZstdParams {
            enable_checksum: true,
            ..ZstdParams::default()
        })
        .unwrap();
        let mut c = checked.create_compressor();
        let mut checked_out: Vec<u8> = c.feed(&data).unwrap().to_vec();
        checked_out.extend_from_slice(&c.finish().unwrap());

        // A checksum adds 4 trailer bytes; both decode to the original.
        assert_eq!(checked_out.len(), plain_out.len() + 4);
        assert_eq!(::zstd::decode_all(checked_out.as_slice()).unwrap(), data);
    }

    #[test]
    fn test_dictionary_round_trip() {
        let dict = ::zstd::dict::from_samples::<&[u8]>(
            &[
                b"sample payload one for dictionary training",
                b"sample payload two for dictionary training",
                b"sample payload three for dictionary training",
                b"sample payload four for dictionary training",
                b"sample payload five for dictionary training",
                b"sample payload six for dictionary training",
                b"sample payload seven for dictionary training",
            ],
            1024,
        );
        // Training can fail on tiny corpora; the factory path is what we
        // exercise, so fall back to no dictionary in that case.
        let dict = dict.ok();

        let factory =
            ZstdCompressorFactory::with_dictionary(ZstdParams::default(), dict.clone()).unwrap();
        let data = b"sample payload one for dictionary training".repeat(64);

        let mut compressor = factory.create_compressor();
        let mut out: Vec<u8> = compressor.feed(&data).unwrap().to_vec();
        out.extend_from_slice(&compressor.finish().unwrap());

        let decoded = match dict {
            Some(dict) => {
                let mut decoder =
                    ::zstd::stream::read::Decoder::with_dictionary(out.as_slice(), &dict).unwrap();
                let mut buf = Vec::new();
                std::io::Read::read_to_end(&mut decoder, &mut buf).unwrap();
                buf
            }
            None => ::zstd::decode_all(out.as_slice()).unwrap(),
        };
        assert_eq!(decoded, data);
    }
}
