//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!
//! environment
//!     → loader.rs (resolve_credentials)
//!     → Credentials handed to the upstream client
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets live only in the environment, the file names the variables

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, resolve_credentials, ConfigError};
pub use schema::{
    FetchConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, RelayConfig, TimeoutConfig,
    UpstreamConfig,
};
