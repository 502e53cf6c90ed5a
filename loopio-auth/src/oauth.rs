//! OAuth 2.0 client-credentials support
//!
//! This module holds the configuration and wire types for the client-credentials
//! grant against the Loopio token endpoint.

use crate::error::{AuthError, AuthResult};
use serde::Deserialize;

/// Loopio OAuth2 token endpoint.
pub const LOOPIO_TOKEN_URL: &str = "https://api.loopio.com/oauth2/access_token";

/// Scopes requested for every token.
pub const DEFAULT_SCOPE: &str = "library:read library:write project:read project:write \
customProjectField:read customProjectField:write file:read file:delete company:read";

/// Grant type sent to the token endpoint.
pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// Client-credentials configuration.
///
/// Holds the client secret, so it is never serialized and its `Debug`
/// output is redacted.
#[derive(Clone)]
pub struct ClientCredentialsConfig {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Token URL
    pub token_url: String,

    /// Space separated scopes to request
    pub scope: String,
}

impl ClientCredentialsConfig {
    /// Create a configuration for the Loopio token endpoint.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: LOOPIO_TOKEN_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Point the grant at a different token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Request a different scope string.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Reject blank credentials before anything touches the network.
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Config("client id is empty".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(AuthError::Config("client secret is empty".to_string()));
        }
        if self.token_url.trim().is_empty() {
            return Err(AuthError::Config("token URL is empty".to_string()));
        }
        Ok(())
    }

    /// Form fields of the grant request.
    pub fn grant_form(&self) -> [(&'static str, &str); 4] {
        [
            ("grant_type", CLIENT_CREDENTIALS_GRANT),
            ("scope", self.scope.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]
    }
}

impl std::fmt::Debug for ClientCredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,

    /// Token type (usually "Bearer")
    #[serde(default)]
    pub token_type: Option<String>,

    /// Expires in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// Granted scopes
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}
