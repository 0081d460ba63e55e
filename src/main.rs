//! Virtual try-on relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 TRY-ON RELAY                 │
//!   POST /api/tryon      │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ─────────────────────┼─▶│  http    │──▶│ validate │──▶│  fetch   │◀─┼──── image hosts
//!                        │  │ server   │   └──────────┘   └────┬─────┘  │
//!                        │  └──────────┘                       ▼        │
//!                        │       ▲                       ┌──────────┐   │
//!                        │       │                       │multipart │   │
//!                        │       │                       └────┬─────┘   │
//!                        │       │        ┌──────────┐        ▼         │
//!   ◀────────────────────┼───────┴────────│ response │◀──┌──────────┐   │
//!   JSON / error         │                │translate │   │ upstream │───┼──▶ try-on API
//!                        │                └──────────┘   └──────────┘   │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use tryon_relay::config::{load_or_default, resolve_credentials};
use tryon_relay::http::HttpServer;
use tryon_relay::lifecycle::{signals, Shutdown};
use tryon_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "tryon-relay", version, about = "Relay try-on requests to the upstream task API")]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "TRYON_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_or_default(args.config.as_deref())?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!("tryon-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let credentials = resolve_credentials(&config.upstream)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.endpoint,
        max_image_bytes = config.fetch.max_image_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    signals::forward_signals(shutdown.clone());

    let server = HttpServer::new(config, credentials)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
