//! Access token lifecycle
//!
//! The [`TokenManager`] acquires bearer tokens with the client-credentials grant,
//! keeps the current one in a shared slot, and refreshes it from a background
//! tokio task on a fixed interval. Request code never talks to the manager
//! directly; it receives a [`TokenHandle`] (or any other [`TokenSource`]) and
//! reads the current value at request time.

use crate::error::{AuthError, AuthResult};
use crate::oauth::{ClientCredentialsConfig, TokenResponse};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Refresh period: one minute ahead of the usual 60 minute token lifetime.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(59 * 60);

/// Consecutive refresh failures after which failures are logged at error level.
pub const ESCALATION_THRESHOLD: u32 = 3;

/// A bearer token issued by the token endpoint.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,

    /// Token type (usually "Bearer")
    pub token_type: String,

    /// When this token was stored
    pub acquired_at: DateTime<Utc>,

    /// Expiry announced by the provider, if any
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wrap a raw token value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_type: "Bearer".to_string(),
            acquired_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Build a token from the endpoint response received at `now`.
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> AuthResult<Self> {
        if response.access_token.trim().is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "access_token is empty".to_string(),
            ));
        }

        let expires_at = response
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| now + chrono::Duration::seconds(secs));

        Ok(Self {
            secret: response.access_token,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            acquired_at: now,
            expires_at,
        })
    }

    /// The raw token value.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Whether the provider-announced expiry has passed at `now`.
    ///
    /// Tokens without an announced expiry never report as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("acquired_at", &self.acquired_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Anything that can hand out the bearer token for the next request.
pub trait TokenSource: Send + Sync {
    /// The current token value, or `None` before the first acquisition.
    fn current_token(&self) -> Option<String>;
}

/// Shared read handle onto the token slot owned by a [`TokenManager`].
///
/// Writers replace the whole value under the lock, so a reader sees either the
/// previous token or the new one.
#[derive(Clone, Default)]
pub struct TokenHandle {
    slot: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenHandle {
    /// Snapshot of the stored token.
    pub fn current(&self) -> Option<AccessToken> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store(&self, token: AccessToken) {
        match self.slot.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }
}

impl TokenSource for TokenHandle {
    fn current_token(&self) -> Option<String> {
        self.current().map(|token| token.secret)
    }
}

/// A fixed token, for callers that already hold one.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Create a source that always returns `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn current_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Everything the refresh task needs, shared with it by `Arc`.
struct TokenFetcher {
    http: Client,
    config: ClientCredentialsConfig,
    handle: TokenHandle,
    failures: AtomicU32,
}

impl TokenFetcher {
    async fn acquire(&self) -> AuthResult<AccessToken> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&self.config.grant_form())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body
            };
            return Err(AuthError::TokenRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;
        let token = AccessToken::from_response(parsed, Utc::now())?;

        self.handle.store(token.clone());
        Ok(token)
    }

    async fn refresh(&self) {
        match self.acquire().await {
            Ok(token) => {
                let previous = self.failures.swap(0, Ordering::SeqCst);
                if previous > 0 {
                    info!(
                        failed_attempts = previous,
                        "Access token refreshed after earlier failures"
                    );
                } else {
                    debug!(expires_at = ?token.expires_at, "Access token refreshed");
                }
            }
            Err(err) => {
                let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= ESCALATION_THRESHOLD {
                    error!(
                        consecutive_failures = failures,
                        error = %err,
                        "Access token refresh keeps failing; continuing with previous token"
                    );
                } else {
                    warn!(
                        consecutive_failures = failures,
                        error = %err,
                        "Access token refresh failed; keeping previous token"
                    );
                }
            }
        }
    }
}

/// Owns the access token and its refresh timer.
pub struct TokenManager {
    fetcher: Arc<TokenFetcher>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl TokenManager {
    /// Create a manager with its own HTTP client.
    ///
    /// Fails with [`AuthError::Config`] on blank credentials; no request is sent.
    pub fn new(config: ClientCredentialsConfig) -> AuthResult<Self> {
        let http = Client::builder().build()?;
        Self::with_client(config, http)
    }

    /// Create a manager that reuses an existing HTTP client.
    pub fn with_client(config: ClientCredentialsConfig, http: Client) -> AuthResult<Self> {
        config.validate()?;

        Ok(Self {
            fetcher: Arc::new(TokenFetcher {
                http,
                config,
                handle: TokenHandle::default(),
                failures: AtomicU32::new(0),
            }),
            refresh_task: Mutex::new(None),
        })
    }

    /// Request a fresh token and store it, replacing any previous one.
    ///
    /// On failure the stored token is left untouched.
    #[instrument(skip(self), fields(token_url = %self.fetcher.config.token_url))]
    pub async fn acquire_token(&self) -> AuthResult<AccessToken> {
        debug!("Requesting access token");
        let token = self.fetcher.acquire().await?;
        info!(expires_at = ?token.expires_at, "Access token acquired");
        Ok(token)
    }

    /// Arm the background refresh, replacing any timer already running.
    ///
    /// The first refresh happens one full `interval` after arming. Must be
    /// called from within a tokio runtime.
    pub fn start_auto_refresh(&self, interval: Duration) -> AuthResult<()> {
        if interval.is_zero() {
            return Err(AuthError::Config(
                "refresh interval must be greater than zero".to_string(),
            ));
        }

        let fetcher = Arc::clone(&self.fetcher);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                fetcher.refresh().await;
            }
        });

        let mut slot = self.lock_task();
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        info!(interval_secs = interval.as_secs(), "Token auto-refresh started");
        Ok(())
    }

    /// Cancel the background refresh. Does nothing when none is armed.
    pub fn stop_auto_refresh(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
            info!("Token auto-refresh stopped");
        }
    }

    /// Whether a refresh timer is currently armed.
    pub fn is_refreshing(&self) -> bool {
        self.lock_task()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// The most recently stored token value, `None` before the first success.
    pub fn current_token(&self) -> Option<String> {
        self.fetcher.handle.current_token()
    }

    /// Snapshot of the stored token with its timestamps.
    pub fn token(&self) -> Option<AccessToken> {
        self.fetcher.handle.current()
    }

    /// Read handle for request executors.
    pub fn handle(&self) -> TokenHandle {
        self.fetcher.handle.clone()
    }

    /// Refresh failures since the last successful refresh.
    pub fn consecutive_failures(&self) -> u32 {
        self.fetcher.failures.load(Ordering::SeqCst)
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.refresh_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenSource for TokenManager {
    fn current_token(&self) -> Option<String> {
        TokenManager::current_token(self)
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        let slot = match self.refresh_task.get_mut() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}
