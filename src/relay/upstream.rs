//! Client for the upstream try-on task API.

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::multipart::MultipartBody;
use crate::relay::types::UpstreamResult;

/// Header carrying the API key alongside the bearer token.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Upstream credentials, injected at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    bearer_token: String,
    api_key: String,
}

impl Credentials {
    pub fn new(bearer_token: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            api_key: api_key.into(),
        }
    }

    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

// Never log secrets.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Sends assembled forms to the task-creation endpoint.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: Url,
        credentials: Credentials,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint,
            credentials,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST the form and decode the JSON answer, whatever its status.
    ///
    /// Transport failures surface as `Unknown`; a body that is not JSON is
    /// an `UpstreamProtocol` error. Status interpretation is left to the
    /// caller.
    pub async fn create_task(&self, form: MultipartBody) -> Result<UpstreamResult, RelayError> {
        let content_type = form.content_type();
        let size = form.len();

        tracing::debug!(
            endpoint = %self.endpoint,
            boundary = %form.boundary(),
            bytes = size,
            "Dispatching try-on task"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .header(AUTHORIZATION, format!("Bearer {}", self.credentials.bearer_token))
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .header(CONTENT_TYPE, content_type)
            .body(form.into_bytes())
            .send()
            .await?;

        let status = response.status();
        metrics::record_upstream_status(status.as_u16());

        let raw = response.bytes().await?;
        let body = serde_json::from_slice(&raw).map_err(|e| RelayError::UpstreamProtocol {
            status,
            reason: e.to_string(),
        })?;

        Ok(UpstreamResult { status, body })
    }
}
