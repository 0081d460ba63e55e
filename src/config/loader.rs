//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{RelayConfig, UpstreamConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::relay::upstream::Credentials;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    MissingSecret(String),
    Client(reqwest::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::MissingSecret(var) => {
                write!(f, "Environment variable {} is not set or empty", var)
            }
            ConfigError::Client(e) => write!(f, "HTTP client error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let config: RelayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the file when a path is given, otherwise validate the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = RelayConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Read upstream credentials from the process environment.
pub fn resolve_credentials(upstream: &UpstreamConfig) -> Result<Credentials, ConfigError> {
    resolve_credentials_with(upstream, |name| std::env::var(name).ok())
}

/// Read upstream credentials through `lookup`.
///
/// The API key is mandatory. The bearer token falls back to the API key,
/// which is how the try-on service issues them.
pub fn resolve_credentials_with<F>(
    upstream: &UpstreamConfig,
    lookup: F,
) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let api_key = non_empty(&upstream.api_key_env)
        .ok_or_else(|| ConfigError::MissingSecret(upstream.api_key_env.clone()))?;

    let bearer_token = if upstream.bearer_token_env.trim().is_empty() {
        None
    } else {
        non_empty(&upstream.bearer_token_env)
    }
    .unwrap_or_else(|| api_key.clone());

    Ok(Credentials::new(bearer_token, api_key))
}
