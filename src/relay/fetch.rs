//! Concurrent image downloads.
//!
//! # Responsibilities
//! - GET every caller-supplied image URL without adding credentials
//! - Enforce the per-image size bound while reading
//! - Join all downloads, failing fast on the first error
//!
//! # Design Decisions
//! - The model and garment downloads are independent futures joined with
//!   `try_join!`; dropping the join cancels whatever is still in flight
//! - Any failure (bad URL, transport error, non-2xx, oversize) is a
//!   `FetchFailed` naming the URL

use std::time::Duration;

use axum::body::Bytes;
use futures_util::future::try_join_all;
use url::Url;

use crate::config::FetchConfig;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::types::{FetchedImages, TryOnRequest};

/// Downloads images referenced by a try-on request.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    timeout: Duration,
}

impl ImageFetcher {
    pub fn new(client: reqwest::Client, config: &FetchConfig, timeout: Duration) -> Self {
        Self {
            client,
            max_bytes: config.max_image_bytes,
            timeout,
        }
    }

    /// Fetch the model image and every garment image concurrently.
    pub async fn fetch_all(&self, request: &TryOnRequest) -> Result<FetchedImages, RelayError> {
        let model = self.fetch(&request.model_url);
        let garments = try_join_all(
            request
                .garments
                .iter()
                .map(|garment| self.fetch(&garment.cloth_url)),
        );

        let (model, garments) = tokio::try_join!(model, garments)?;
        Ok(FetchedImages { model, garments })
    }

    /// Download a single image into memory.
    pub async fn fetch(&self, raw_url: &str) -> Result<Bytes, RelayError> {
        let failed = |reason: String| RelayError::FetchFailed {
            url: raw_url.to_string(),
            reason,
        };

        let url = Url::parse(raw_url).map_err(|e| failed(format!("invalid URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(failed(format!("unsupported scheme '{}'", url.scheme())));
        }

        let mut response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("status {}", status)));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(failed(format!(
                    "image is {} bytes, limit is {}",
                    len, self.max_bytes
                )));
            }
        }

        let mut buf = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
            if (buf.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(failed(format!("image exceeds {} bytes", self.max_bytes)));
            }
            buf.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %raw_url, bytes = buf.len(), "Image fetched");
        metrics::record_image_fetch(buf.len());

        Ok(Bytes::from(buf))
    }
}
