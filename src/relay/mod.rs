//! Try-on relay pipeline.
//!
//! # Data Flow
//! ```text
//! POST /api/tryon (JSON)
//!     → handler.rs (method check, body limit)
//!     → validate.rs (TryOnRequest or 400)
//!     → fetch.rs (model + garments, concurrently, fail fast)
//!     → multipart.rs (model_image, cloth_image_i, cloth_type_i, closing boundary)
//!     → upstream.rs (single POST with credentials)
//!     → error.rs (status/body passthrough or translated error)
//! ```
//!
//! # Design Decisions
//! - Nothing outlives one invocation: no caches, no retries
//! - Validation never touches the network
//! - Upstream payloads are opaque and relayed verbatim

pub mod error;
pub mod fetch;
pub mod handler;
pub mod multipart;
pub mod types;
pub mod upstream;
pub mod validate;

pub use error::RelayError;
pub use fetch::ImageFetcher;
pub use multipart::{Boundary, MultipartBody, MultipartBuilder};
pub use types::{FetchedImages, Garment, TryOnRequest, UpstreamResult, MAX_GARMENTS};
pub use upstream::{Credentials, UpstreamClient};

/// The fetch → assemble → dispatch pipeline for one validated request.
#[derive(Clone)]
pub struct TryOnRelay {
    fetcher: ImageFetcher,
    upstream: UpstreamClient,
}

impl TryOnRelay {
    pub fn new(fetcher: ImageFetcher, upstream: UpstreamClient) -> Self {
        Self { fetcher, upstream }
    }

    /// Run the pipeline. Only a 2xx upstream answer is `Ok`.
    pub async fn relay(&self, request: &TryOnRequest) -> Result<UpstreamResult, RelayError> {
        let images = self.fetcher.fetch_all(request).await?;

        let form = multipart::tryon_form(images, &request.garments)
            .build()
            .map_err(|e| RelayError::Unknown(e.to_string()))?;

        tracing::debug!(
            garments = request.garments.len(),
            parts = form.part_count(),
            boundary = %form.boundary(),
            "Assembled try-on form"
        );

        let result = self.upstream.create_task(form).await?;
        if !result.status.is_success() {
            return Err(RelayError::UpstreamRejected {
                status: result.status,
                body: result.body,
            });
        }

        Ok(result)
    }
}
