//! Authenticated request executor for the Loopio REST API.
//!
//! Every endpoint goes through [`ApiClient::execute`], which attaches the
//! current bearer token, serializes the body, and normalizes the outcome into
//! an [`ApiResponse`] or a [`ClientError`]. There is no retry and no explicit
//! timeout at this layer.

use super::config::LoopioConfig;
use loopio_auth::TokenSource;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Loopio client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// API returned a non-2xx response.
    #[error("Loopio API request failed: {status} {status_text} - {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Canonical status text.
        status_text: String,
        /// Raw response body.
        body: String,
    },

    /// HTTP request failed below the protocol level.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body could not be decoded.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Request parameters were rejected before anything was sent.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// No access token has been acquired yet.
    #[error("No access token available; the token manager has not acquired one yet")]
    NotAuthenticated,
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// HTTP verbs used by the Loopio API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request body content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// `application/json`
    #[default]
    Json,
    /// `application/json-patch+json`, for PATCH bodies made of patch operations
    JsonPatch,
}

impl ContentType {
    /// MIME type sent in the `Content-Type` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::JsonPatch => "application/json-patch+json",
        }
    }
}

/// One outbound call. Built per invocation and consumed by [`ApiClient::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: HttpMethod,

    /// Path appended verbatim to the base URL (e.g. `/libraryEntries/42`).
    pub path: String,

    /// Query pairs in emission order; keys may repeat.
    pub query: Vec<(String, String)>,

    /// JSON body.
    pub body: Option<Value>,

    /// Body content type.
    pub content_type: ContentType,

    /// Extra headers, applied last so they can override the defaults.
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Create a request with no query, body or extra headers.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: ContentType::Json,
            headers: Vec::new(),
        }
    }

    /// GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Append a query pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a JSON Patch body and switch the content type accordingly.
    pub fn with_json_patch(mut self, operations: Value) -> Self {
        self.body = Some(operations);
        self.content_type = ContentType::JsonPatch;
        self
    }

    /// Add or override a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Outcome of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Parsed JSON body.
    Json(Value),
    /// 204 No Content.
    NoContent,
}

impl ApiResponse {
    /// JSON value of the response; `NoContent` becomes `{}`.
    pub fn into_value(self) -> Value {
        match self {
            ApiResponse::Json(value) => value,
            ApiResponse::NoContent => Value::Object(Default::default()),
        }
    }

    /// Whether the call returned no body.
    pub fn is_no_content(&self) -> bool {
        matches!(self, ApiResponse::NoContent)
    }
}

/// Loopio REST client.
///
/// Stateless per call; the only shared input is the token source, read once
/// at the start of every request.
#[derive(Clone)]
pub struct ApiClient {
    /// HTTP client instance.
    client: Client,

    /// Base URL without a trailing slash.
    base_url: String,

    /// Where the bearer token comes from.
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    /// Create a new client for the configured base URL.
    pub fn new(config: &LoopioConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, ClientError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(config, tokens, client))
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(config: &LoopioConfig, tokens: Arc<dyn TokenSource>, client: Client) -> Self {
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one authenticated call.
    #[instrument(skip(self, request), fields(method = request.method.as_str(), path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let token = self
            .tokens
            .current_token()
            .ok_or(ClientError::NotAuthenticated)?;

        let headers = build_headers(&token, &request)?;
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .headers(headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(ref body) = request.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ClientError::InvalidParams(format!("body serialization failed: {}", e)))?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            debug!("Loopio API returned 204 No Content");
            return Ok(ApiResponse::NoContent);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Loopio API error ({}): {}", status.as_u16(), body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map(ApiResponse::Json)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

fn build_headers(token: &str, request: &ApiRequest) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();

    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ClientError::InvalidParams("access token is not a valid header value".to_string()))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(request.content_type.as_str()),
    );

    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidParams(format!("invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ClientError::InvalidParams(format!("invalid header value for {}", name)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}
