//! Service configuration for the Loopio client.
//!
//! Configuration is loaded from environment variables with the public Loopio
//! API as the default base URL. Client credentials are required.

use loopio_auth::{ClientCredentialsConfig, DEFAULT_REFRESH_INTERVAL};
use std::time::Duration;
use thiserror::Error;

/// Default Loopio data API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.loopio.com/data/v2";

/// Environment variable holding the API base URL.
pub const ENV_API_BASE_URL: &str = "LOOPIO_API_BASE_URL";

/// Environment variable holding the OAuth client id.
pub const ENV_CLIENT_ID: &str = "LOOPIO_CLIENT_ID";

/// Environment variable holding the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "LOOPIO_CLIENT_SECRET";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Loopio service configuration. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct LoopioConfig {
    /// Base URL every endpoint path is appended to.
    pub api_base_url: String,

    /// OAuth2 client credentials.
    pub credentials: ClientCredentialsConfig,

    /// Token refresh period.
    pub refresh_interval: Duration,
}

impl LoopioConfig {
    /// Create a configuration with the default base URL and refresh interval.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            credentials: ClientCredentialsConfig::new(client_id, client_secret),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LOOPIO_API_BASE_URL`: API base URL (default: https://api.loopio.com/data/v2)
    /// - `LOOPIO_CLIENT_ID`: OAuth client id (required)
    /// - `LOOPIO_CLIENT_SECRET`: OAuth client secret (required)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let client_id = required(ENV_CLIENT_ID)?;
        let client_secret = required(ENV_CLIENT_SECRET)?;

        let api_base_url = lookup(ENV_API_BASE_URL)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: ENV_API_BASE_URL.to_string(),
                message: format!("expected an http(s) URL, got '{}'", api_base_url),
            });
        }

        Ok(Self::new(client_id, client_secret).with_base_url(api_base_url))
    }

    /// Build a full URL by appending an endpoint path verbatim to the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}
