//! # Loopio Authentication
//!
//! This crate provides OAuth2 client-credentials token management for the
//! Loopio REST API.
//!
//! ## Overview
//!
//! The loopio-auth crate handles:
//! - **Configuration**: client id, secret, token endpoint and scope
//! - **Acquisition**: form-encoded `client_credentials` grant requests
//! - **Refresh**: a background tokio task replacing the token on a fixed interval
//! - **Access**: a cheap, cloneable [`TokenHandle`] for request executors
//!
//! ## Usage
//!
//! ```rust,no_run
//! use loopio_auth::{ClientCredentialsConfig, TokenManager, DEFAULT_REFRESH_INTERVAL};
//!
//! async fn setup() -> loopio_auth::AuthResult<()> {
//!     let config = ClientCredentialsConfig::new("client-id", "client-secret");
//!     let manager = TokenManager::new(config)?;
//!
//!     // Fetch the first token before serving anything
//!     manager.acquire_token().await?;
//!
//!     // Keep it fresh; the timer is cancelled on stop or drop
//!     manager.start_auto_refresh(DEFAULT_REFRESH_INTERVAL)?;
//!
//!     let handle = manager.handle();
//!     println!("token present: {}", handle.current().is_some());
//!
//!     manager.stop_auto_refresh();
//!     Ok(())
//! }
//! ```
//!
//! ## Refresh failures
//!
//! A failed refresh never clears the stored token and never stops the timer.
//! Failures are logged with a consecutive-failure count and escalate to
//! error level after [`ESCALATION_THRESHOLD`] attempts in a row.

pub mod error;
pub mod oauth;
pub mod token;

// Re-export main types
pub use error::{AuthError, AuthResult};
pub use oauth::{ClientCredentialsConfig, TokenResponse, DEFAULT_SCOPE, LOOPIO_TOKEN_URL};
pub use token::{
    AccessToken, StaticToken, TokenHandle, TokenManager, TokenSource, DEFAULT_REFRESH_INTERVAL,
    ESCALATION_THRESHOLD,
};
