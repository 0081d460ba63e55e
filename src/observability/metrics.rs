//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tryon_requests_total` (counter): relay invocations by outcome
//! - `tryon_request_duration_seconds` (histogram): latency by outcome
//! - `tryon_image_fetch_bytes` (histogram): downloaded image sizes
//! - `tryon_upstream_status_total` (counter): upstream answers by status

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished relay invocation.
pub fn record_request(outcome: &'static str, start: Instant) {
    metrics::counter!("tryon_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("tryon_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record the size of a downloaded image.
pub fn record_image_fetch(bytes: usize) {
    metrics::histogram!("tryon_image_fetch_bytes").record(bytes as f64);
}

/// Record the status code the upstream answered with.
pub fn record_upstream_status(status: u16) {
    metrics::counter!("tryon_upstream_status_total", "status" => status.to_string()).increment(1);
}
