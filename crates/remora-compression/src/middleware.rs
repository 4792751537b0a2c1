//! Middleware adapter over the streaming filter
//!
//! For servers that buffer whole response bodies, this drives a
//! [`CompressorFilter`] with the collected body as a single terminal chunk.
//! Because the full body is in hand, the adapter can re-frame
//! `content-length` after compression instead of leaving the stream
//! length-omitted.

use crate::config::FilterConfig;
use crate::filter::{CompressorFilter, Decision};
use async_trait::async_trait;
use bytes::BytesMut;
use http::{header, HeaderValue, Request, Response};
use http_body_util::BodyExt;
use remora_core::{Body, Error, Middleware, Next, Result};
use remora_stats::StatsRecorder;
use std::sync::Arc;
use tracing::{debug, warn};

/// Compression middleware wrapping the streaming core
#[derive(Debug)]
pub struct CompressionMiddleware {
    config: Arc<FilterConfig>,
    stats: Arc<dyn StatsRecorder>,
}

impl CompressionMiddleware {
    /// Create a middleware sharing `config` across all requests it serves
    pub fn new(config: Arc<FilterConfig>, stats: Arc<dyn StatsRecorder>) -> Self {
        Self { config, stats }
    }
}

#[async_trait]
impl Middleware for CompressionMiddleware {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        let request_headers = req.headers().clone();

        let response = next.run(req).await?;

        // Compress successful responses only; errors go out untouched.
        if !response.status().is_success() {
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| Error::Middleware(format!("failed to read response body: {e}")))?
            .to_bytes();

        let mut filter = CompressorFilter::new(Arc::clone(&self.config), Arc::clone(&self.stats));
        let decision =
            filter.on_response_headers(&request_headers, &mut parts.headers, false)?;

        if decision != Decision::Compressing {
            return Ok(Response::from_parts(parts, Body::from(body_bytes)));
        }

        let mut data = BytesMut::from(&body_bytes[..]);
        if let Err(e) = filter.on_body_chunk(&mut data, true) {
            // The stream is already torn down; serve the original bytes.
            warn!(error = %e, "compression failed, returning uncompressed response");
            parts.headers.remove(header::CONTENT_ENCODING);
            parts.headers.insert(
                header::CONTENT_LENGTH,
                HeaderValue::from(body_bytes.len()),
            );
            return Ok(Response::from_parts(parts, Body::from(body_bytes)));
        }

        debug!(
            encoding = self.config.content_encoding(),
            uncompressed = filter.uncompressed_bytes(),
            compressed = filter.compressed_bytes(),
            "response compressed"
        );

        // The body was buffered, so the final length is known again.
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(data.len()));
        parts.headers.remove(header::TRANSFER_ENCODING);

        Ok(Response::from_parts(parts, Body::from(data.freeze())))
    }
}
