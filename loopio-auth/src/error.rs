//! Error types for token operations
//!
//! This module defines the errors that can occur while validating client
//! credentials and acquiring access tokens from the OAuth2 token endpoint.

use thiserror::Error;

/// Authentication error types.
///
/// Covers configuration problems detected before any network call, token
/// endpoint rejections, malformed token responses, and transport failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Client credentials are missing or unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token endpoint answered with a non-2xx status
    #[error("Token request rejected ({status}): {message}")]
    TokenRejected {
        /// HTTP status code
        status: u16,
        /// Response body or status text
        message: String,
    },

    /// Token endpoint answered 2xx but the body carried no usable token
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    /// Network-level failure talking to the token endpoint
    #[error("Token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Whether the failure happened below HTTP (DNS, connect, reset).
    pub fn is_transport(&self) -> bool {
        matches!(self, AuthError::Transport(_))
    }

    /// HTTP status returned by the token endpoint, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AuthError::TokenRejected { status, .. } => Some(*status),
            AuthError::Transport(err) => err.status().map(|s| s.as_u16()),
            AuthError::Config(_) | AuthError::InvalidTokenResponse(_) => None,
        }
    }

    /// Get error code for diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Config(_) => "CONFIG_ERROR",
            AuthError::TokenRejected { .. } => "TOKEN_REJECTED",
            AuthError::InvalidTokenResponse(_) => "INVALID_TOKEN_RESPONSE",
            AuthError::Transport(_) => "TRANSPORT_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_carries_status() {
        let err = AuthError::TokenRejected {
            status: 401,
            message: "invalid_client".to_string(),
        };
        assert_eq!(err.to_string(), "Token request rejected (401): invalid_client");
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.error_code(), "TOKEN_REJECTED");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_config_error_has_no_status() {
        let err = AuthError::Config("client id is empty".to_string());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }
}
