//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Build the shared outbound HTTP client and relay pipeline
//! - Wire up middleware (tracing, request ID, panic capture)
//! - Bind server to listener with graceful shutdown

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::Span;
use url::Url;

use crate::config::validation::ValidationError;
use crate::config::{ConfigError, RelayConfig};
use crate::http::request::{request_id_middleware, RequestId};
use crate::relay::handler::tryon_handler;
use crate::relay::{Credentials, ImageFetcher, RelayError, TryOnRelay, UpstreamClient};

/// Route serving try-on requests.
pub const TRYON_PATH: &str = "/api/tryon";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<TryOnRelay>,
    pub max_body_size: usize,
}

/// HTTP server for the try-on relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and upstream
    /// credentials.
    pub fn new(config: RelayConfig, credentials: Credentials) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(ConfigError::Client)?;

        let endpoint = Url::parse(&config.upstream.endpoint).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidEndpoint(
                config.upstream.endpoint.clone(),
            )])
        })?;

        let fetcher = ImageFetcher::new(
            client.clone(),
            &config.fetch,
            Duration::from_secs(config.timeouts.fetch_secs),
        );
        let upstream = UpstreamClient::new(
            client,
            endpoint,
            credentials,
            Duration::from_secs(config.timeouts.upstream_secs),
        );

        let state = AppState {
            relay: Arc::new(TryOnRelay::new(fetcher, upstream)),
            max_body_size: config.limits.max_body_size,
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(TRYON_PATH, any(tryon_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(CatchPanicLayer::custom(panic_response))
    }

    /// A clone of the fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.endpoint,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Per-request span for the trace layer. Runs inside the request ID
/// middleware, so the ID is already in the extensions.
fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(RequestId::as_str)
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Last-resort response when a handler panics.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        String::new()
    };

    tracing::error!(error = %message, "Handler panicked");
    RelayError::Unknown(message).into_response()
}
