//! Filter configuration and the compression decision policy
//!
//! One [`FilterConfig`] is built per configured filter instance and shared
//! read-only across every stream it serves. All per-stream state lives in
//! [`CompressorFilter`](crate::filter::CompressorFilter).

use crate::compressor::{Compressor, CompressorFactory};
use http::header;
use http::HeaderMap;
use remora_core::RuntimeFlags;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declarative knobs for the compression decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionSettings {
    /// Bodies with a declared content-length below this are not compressed
    #[serde(default = "default_min_content_length")]
    pub min_content_length: u64,

    /// Content-type prefixes eligible for compression; empty disables the
    /// content-type check entirely
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,
}

fn default_min_content_length() -> u64 {
    30
}

fn default_content_types() -> Vec<String> {
    vec![
        "text/".to_string(),
        "application/json".to_string(),
        "application/javascript".to_string(),
        "application/xml".to_string(),
        "application/grpc-web".to_string(),
        "image/svg+xml".to_string(),
    ]
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            min_content_length: default_min_content_length(),
            content_types: default_content_types(),
        }
    }
}

/// Immutable per-instance filter configuration
///
/// Holds the negotiation policy, the runtime kill switch, and the bound
/// codec factory. Constructed once at configuration load and never mutated.
#[derive(Debug)]
pub struct FilterConfig {
    settings: CompressionSettings,
    stats_prefix: String,
    enabled_key: String,
    runtime: Arc<dyn RuntimeFlags>,
    factory: Arc<dyn CompressorFactory>,
}

impl FilterConfig {
    /// Bind settings, runtime flags, and a codec factory into one shared
    /// config
    ///
    /// The runtime kill switch is keyed `<stats_prefix>.filter_enabled`.
    pub fn new(
        settings: CompressionSettings,
        stats_prefix: impl Into<String>,
        runtime: Arc<dyn RuntimeFlags>,
        factory: Arc<dyn CompressorFactory>,
    ) -> Self {
        let stats_prefix = stats_prefix.into();
        let enabled_key = format!("{stats_prefix}.filter_enabled");
        Self {
            settings,
            stats_prefix,
            enabled_key,
            runtime,
            factory,
        }
    }

    /// Namespace for counters emitted by streams of this config
    pub fn stats_prefix(&self) -> &str {
        &self.stats_prefix
    }

    /// The content-encoding token this config advertises
    pub fn content_encoding(&self) -> &'static str {
        self.factory.content_encoding()
    }

    /// Obtain a fresh per-stream compressor from the bound factory
    pub fn create_compressor(&self) -> Box<dyn Compressor> {
        self.factory.create_compressor()
    }

    /// Query the runtime kill switch; evaluated once per stream
    pub fn feature_enabled(&self) -> bool {
        self.runtime.feature_enabled(&self.enabled_key, true)
    }

    /// The compression decision, made once from header state alone
    ///
    /// Rules in order, first match wins: runtime kill switch off, body
    /// already encoded, declared length under the threshold, content type
    /// not in the allowlist, client not accepting our token — each means
    /// passthrough. Otherwise compress.
    pub fn should_compress(
        &self,
        request_headers: &HeaderMap,
        response_headers: &HeaderMap,
    ) -> bool {
        if !self.feature_enabled() {
            return false;
        }

        // Already compressed upstream
        if response_headers.contains_key(header::CONTENT_ENCODING) {
            return false;
        }

        if let Some(length) = declared_content_length(response_headers) {
            if length < self.settings.min_content_length {
                return false;
            }
        }

        if !self.is_compressible_content_type(response_headers) {
            return false;
        }

        self.accepts_encoding(request_headers)
    }

    fn is_compressible_content_type(&self, response_headers: &HeaderMap) -> bool {
        if self.settings.content_types.is_empty() {
            return true;
        }
        let Some(content_type) = response_headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        else {
            // No declared type: pass the check and let negotiation decide.
            return true;
        };
        let content_type = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        self.settings
            .content_types
            .iter()
            .any(|prefix| content_type.starts_with(prefix.as_str()))
    }

    /// Whether the request's accept-encoding header admits our token with a
    /// non-zero quality
    fn accepts_encoding(&self, request_headers: &HeaderMap) -> bool {
        let Some(accept) = request_headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };
        let token = self.content_encoding();

        for part in accept.split(',') {
            let (encoding, quality) = parse_encoding_with_quality(part.trim());
            if (encoding.eq_ignore_ascii_case(token) || encoding == "*") && quality > 0.0 {
                return true;
            }
        }
        false
    }
}

/// Parses an entry like `gzip` or `br;q=0.8` into `(encoding, quality)`
fn parse_encoding_with_quality(s: &str) -> (&str, f32) {
    let mut parts = s.splitn(2, ';');
    let encoding = parts.next().unwrap_or("").trim();

    let quality = parts
        .next()
        .and_then(|q| {
            let q = q.trim();
            if q.starts_with("q=") || q.starts_with("Q=") {
                q[2..].parse::<f32>().ok()
            } else {
                None
            }
        })
        .unwrap_or(1.0);

    (encoding, quality)
}

fn declared_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gzip::{GzipCompressorFactory, GzipParams};
    use remora_core::{AlwaysEnabled, StaticFlags};

    fn gzip_config(runtime: Arc<dyn RuntimeFlags>) -> FilterConfig {
        FilterConfig::new(
            CompressionSettings::default(),
            "test.compressor",
            runtime,
            Arc::new(GzipCompressorFactory::new(GzipParams::default()).unwrap()),
        )
    }

    fn request_headers(accept: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(accept) = accept {
            headers.insert(header::ACCEPT_ENCODING, accept.parse().unwrap());
        }
        headers
    }

    fn response_headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        headers
    }

    #[test]
    fn test_compresses_when_all_rules_pass() {
        let config = gzip_config(Arc::new(AlwaysEnabled));
        let req = request_headers(Some("gzip, deflate"));
        let resp = response_headers(&[("content-type", "application/json"), ("content-length", "2048")]);
        assert!(config.should_compress(&req, &resp));
    }

    #[test]
    fn test_feature_flag_off_means_passthrough() {
        let flags = StaticFlags::new().set("test.compressor.filter_enabled", false);
        let config = gzip_config(Arc::new(flags));
        let req = request_headers(Some("gzip"));
        let resp = response_headers(&[("content-type", "text/plain")]);
        assert!(!config.should_compress(&req, &resp));
    }

    #[test]
    fn test_already_encoded_means_passthrough() {
        let config = gzip_config(Arc::new(AlwaysEnabled));
        let req = request_headers(Some("gzip"));
        let resp = response_headers(&[
            ("content-type", "text/plain"),
            ("content-encoding", "br"),
        ]);
        assert!(!config.should_compress(&req, &resp));
    }

    #[test]
    fn test_short_body_means_passthrough() {
        let config = FilterConfig::new(
            CompressionSettings {
                min_content_length: 100,
                ..CompressionSettings::default()
            },
            "test.compressor",
            Arc::new(AlwaysEnabled),
            Arc::new(GzipCompressorFactory::new(GzipParams::default()).unwrap()),
        );
        let req = request_headers(Some("gzip"));
        let resp = response_headers(&[("content-type", "text/plain"), ("content-length", "50")]);
        assert!(!config.should_compress(&req, &resp));

        // No declared length: threshold cannot apply.
        let resp = response_headers(&[("content-type", "text/plain")]);
        assert!(config.should_compress(&req, &resp));
    }

    #[test]
    fn test_missing_token_means_passthrough() {
        let config = gzip_config(Arc::new(AlwaysEnabled));
        let resp = response_headers(&[("content-type", "text/html")]);

        assert!(!config.should_compress(&request_headers(Some("br, deflate")), &resp));
        assert!(!config.should_compress(&request_headers(None), &resp));
    }

    #[test]
    fn test_quality_values() {
        let config = gzip_config(Arc::new(AlwaysEnabled));
        let resp = response_headers(&[("content-type", "text/html")]);

        assert!(config.should_compress(&request_headers(Some("gzip;q=0.8")), &resp));
        assert!(!config.should_compress(&request_headers(Some("gzip;q=0")), &resp));
        assert!(config.should_compress(&request_headers(Some("br;q=0, *;q=0.1")), &resp));
    }

    #[test]
    fn test_content_type_allowlist() {
        let config = gzip_config(Arc::new(AlwaysEnabled));
        let req = request_headers(Some("gzip"));

        assert!(!config.should_compress(&req, &response_headers(&[("content-type", "image/png")])));
        assert!(config.should_compress(
            &req,
            &response_headers(&[("content-type", "application/json;charset=utf-8")])
        ));
        // No declared content type is allowed through.
        assert!(config.should_compress(&req, &response_headers(&[])));
    }
}
