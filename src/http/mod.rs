//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, panic capture, tracing)
//!     → request.rs (resolve X-Request-ID)
//!     → relay::handler (POST /api/tryon)
//!     → Send to client (X-Request-ID echoed)
//! ```

pub mod request;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, TRYON_PATH};
