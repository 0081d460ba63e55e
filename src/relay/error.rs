//! Relay error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::relay::types::MAX_GARMENTS;

/// Message used when a failure carries no text of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "unknown error";

/// Every way a relay invocation can fail.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Inbound method was not POST.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// `model_url` or `prendas` absent or malformed.
    #[error("missing fields: model_url, prendas (array)")]
    MissingFields,

    /// More garments than the upstream accepts.
    #[error("only up to {max} garments allowed per request", max = MAX_GARMENTS)]
    TooManyGarments { count: usize },

    /// A garment entry lacks a usable field. `index` is 1-based.
    #[error("garment {index} is missing a valid {field}")]
    InvalidGarment { index: usize, field: &'static str },

    /// Inbound body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// An image download did not complete successfully.
    #[error("failed to fetch image {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// Upstream answered with a non-2xx status; passed through verbatim.
    #[error("upstream rejected the task with status {status}")]
    UpstreamRejected { status: StatusCode, body: Value },

    /// Upstream answered with something that is not JSON.
    #[error("upstream returned a non-JSON body (status {status}): {reason}")]
    UpstreamProtocol { status: StatusCode, reason: String },

    /// Anything not classified above.
    #[error("{}", unknown_message(.0))]
    Unknown(String),
}

impl RelayError {
    /// Stable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MethodNotAllowed => "method_not_allowed",
            RelayError::MissingFields
            | RelayError::TooManyGarments { .. }
            | RelayError::InvalidGarment { .. }
            | RelayError::PayloadTooLarge { .. } => "validation_failed",
            RelayError::FetchFailed { .. } => "fetch_failed",
            RelayError::UpstreamRejected { .. } => "upstream_rejected",
            RelayError::UpstreamProtocol { .. } => "upstream_protocol_error",
            RelayError::Unknown(_) => "unknown_error",
        }
    }

    /// Status code returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingFields
            | RelayError::TooManyGarments { .. }
            | RelayError::InvalidGarment { .. } => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::FetchFailed { .. } | RelayError::UpstreamProtocol { .. } => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::UpstreamRejected { status, .. } => *status,
            RelayError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RelayError::MethodNotAllowed
                | RelayError::MissingFields
                | RelayError::TooManyGarments { .. }
                | RelayError::InvalidGarment { .. }
                | RelayError::PayloadTooLarge { .. }
        )
    }
}

fn unknown_message(message: &str) -> &str {
    if message.is_empty() {
        UNKNOWN_ERROR_MESSAGE
    } else {
        message
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Unknown(e.to_string())
    }
}

/// JSON body shared by every relay-generated error.
pub fn error_body(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "error": message.into() }))
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            RelayError::UpstreamRejected { body, .. } => (status, Json(body)).into_response(),
            other => (status, error_body(other.to_string())).into_response(),
        }
    }
}
