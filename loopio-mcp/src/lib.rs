//! # Loopio MCP
//!
//! This crate exposes the Loopio RFP content platform to AI assistants as an
//! MCP (Model Context Protocol) server.
//!
//! ## Overview
//!
//! The loopio-mcp crate handles:
//! - **Clients**: the authenticated Loopio REST executor and its endpoint table
//! - **Models**: typed, validated request bodies
//! - **Tools**: one tool per Loopio operation (library, projects, structure)
//! - **Resources/Prompts**: `loopio://libraryEntry/{id}` and `searchLibraryEntries`
//! - **JSON-RPC**: MCP protocol handling over newline-delimited stdio
//!
//! Authentication lives in `loopio-auth`: a `TokenManager` acquires a
//! client-credentials token at startup and refreshes it on a timer. The
//! executor reads whatever token is current at the moment each call starts.
//!
//! Supported methods:
//! - `initialize`, `ping`
//! - `tools/list`, `tools/call`
//! - `resources/list`, `resources/templates/list`, `resources/read`
//! - `prompts/list`, `prompts/get`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use loopio_mcp::{app, LoopioConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LoopioConfig::from_env()?;
//!     app::run(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Calling the API directly
//!
//! ```rust,no_run
//! use loopio_auth::StaticToken;
//! use loopio_mcp::clients::endpoints::LIST_PROJECTS;
//! use loopio_mcp::{ApiClient, LoopioConfig};
//! use std::sync::Arc;
//!
//! async fn projects() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LoopioConfig::from_env()?;
//!     let client = ApiClient::new(&config, Arc::new(StaticToken::new("token")))?;
//!     let request = LIST_PROJECTS.request(&serde_json::json!({"page": 1, "pageSize": 50}), None)?;
//!     let page = client.execute(request).await?;
//!     println!("{:?}", page.into_value());
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod clients;
pub mod models;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export main types
pub use app::StartupError;
pub use clients::{
    ApiClient, ApiRequest, ApiResponse, ClientError, ConfigError, Endpoint, HttpMethod,
    LoopioConfig,
};
pub use server::{
    McpServer, McpServerError, McpServerResult, Prompt, ResourceHandler, Tool, ToolContext,
};
pub use tools::{all_tools, EndpointTool, Render};
pub use types::{
    ContentBlock, McpError, McpRequest, McpResponse, PromptDefinition, PromptMessage, RequestId,
    ResourceContents, ResourceTemplate, ServerCapabilities, ServerInfo,
    ToolCall, ToolDefinition, ToolResult,
};
