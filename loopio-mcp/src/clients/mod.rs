//! Loopio REST API client.
//!
//! - `config`: environment-driven service configuration
//! - `executor`: the authenticated request executor every call goes through
//! - `endpoints`: the declarative table of Loopio operations

pub mod config;
pub mod endpoints;
pub mod executor;

pub use config::{ConfigError, LoopioConfig};
pub use endpoints::{Endpoint, QueryKind, QueryParam};
pub use executor::{ApiClient, ApiRequest, ApiResponse, ClientError, ContentType, HttpMethod};
