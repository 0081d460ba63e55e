use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_LENGTH, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::Instrument;

use crate::http::request::RequestId;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::types::UpstreamResult;
use crate::relay::validate::parse_request;

/// `/api/tryon` handler. Always produces a response: every failure is
/// classified into a [`RelayError`] and rendered.
pub async fn tryon_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let span = tracing::info_span!("tryon", request_id = %request_id);
    let result = run(&state, request).instrument(span.clone()).await;

    span.in_scope(|| match result {
        Ok(upstream) => {
            tracing::info!(status = %upstream.status, "Try-on task created");
            metrics::record_request("success", start_time);
            (StatusCode::OK, Json(upstream.body)).into_response()
        }
        Err(err) => {
            log_failure(&err);
            metrics::record_request(err.kind(), start_time);
            err.into_response()
        }
    })
}

async fn run(state: &AppState, request: Request<Body>) -> Result<UpstreamResult, RelayError> {
    if request.method() != Method::POST {
        return Err(RelayError::MethodNotAllowed);
    }

    let limit = state.max_body_size;
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(RelayError::PayloadTooLarge { limit });
    }

    let body = match axum::body::to_bytes(request.into_body(), limit).await {
        Ok(body) => body,
        // Without a declared length, a read error is the limit tripping.
        Err(_) if declared.is_none() => return Err(RelayError::PayloadTooLarge { limit }),
        Err(e) => return Err(RelayError::Unknown(e.to_string())),
    };

    let tryon = parse_request(&body)?;
    tracing::debug!(
        model_url = %tryon.model_url,
        garments = tryon.garments.len(),
        "Relaying try-on request"
    );

    state.relay.relay(&tryon).await
}

fn log_failure(err: &RelayError) {
    match err {
        RelayError::UpstreamRejected { status, body } => {
            tracing::error!(status = %status, body = %body, "Upstream error");
        }
        e if e.is_client_error() => {
            tracing::warn!(kind = e.kind(), error = %e, "Rejected try-on request");
        }
        e => {
            tracing::error!(kind = e.kind(), error = %e, "Relay error");
        }
    }
}
