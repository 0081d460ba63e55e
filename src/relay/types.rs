//! Request and result types for the try-on relay.

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Maximum number of garments the upstream accepts per task.
pub const MAX_GARMENTS: usize = 3;

/// A validated try-on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryOnRequest {
    /// URL of the person/model photo.
    pub model_url: String,

    /// Garments to put on the model, in upstream slot order.
    #[serde(rename = "prendas")]
    pub garments: Vec<Garment>,
}

/// One clothing reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garment {
    /// URL of the garment photo.
    pub cloth_url: String,

    /// Garment category label, forwarded verbatim (e.g. "upper", "lower").
    pub cloth_type: String,
}

/// Image buffers downloaded for one request.
#[derive(Debug, Clone)]
pub struct FetchedImages {
    pub model: Bytes,
    /// One buffer per garment, in request order.
    pub garments: Vec<Bytes>,
}

/// Status and JSON body returned by the upstream service.
///
/// Opaque to the relay: task ids and error payloads pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResult {
    pub status: StatusCode,
    pub body: serde_json::Value,
}
