//! Process lifecycle: authenticate, register, serve, shut down.

use crate::clients::{ApiClient, ClientError, ConfigError, LoopioConfig};
use crate::resources::{LibraryEntryResource, SearchLibraryEntriesPrompt};
use crate::server::McpServer;
use crate::tools::all_tools;
use crate::transport::serve_stdio;
use loopio_auth::{AuthError, TokenManager, TokenSource};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{info, instrument};

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The initial access token could not be obtained.
    #[error("Failed to obtain Loopio access token: {0}")]
    Token(#[from] AuthError),

    /// The HTTP client could not be built.
    #[error("Failed to build Loopio client: {0}")]
    Client(#[from] ClientError),

    /// stdio failed while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Register every tool, the library entry resource and the search prompt.
pub async fn register_all(server: &McpServer, client: Arc<ApiClient>) {
    server.register_tools(all_tools(client.clone())).await;
    server
        .register_resource_template(Arc::new(LibraryEntryResource::new(client)))
        .await;
    server
        .register_prompt(Arc::new(SearchLibraryEntriesPrompt))
        .await;
}

/// Build a fully registered server reading tokens from `tokens`.
pub async fn build_server(
    config: &LoopioConfig,
    tokens: Arc<dyn TokenSource>,
) -> Result<McpServer, StartupError> {
    let client = Arc::new(ApiClient::new(config, tokens)?);
    let server = McpServer::loopio();
    register_all(&server, client).await;
    Ok(server)
}

/// Authenticate and arm the refresh timer, then build the server.
///
/// The returned manager must outlive the server; dropping it cancels the
/// refresh timer.
#[instrument(skip(config), fields(base_url = %config.api_base_url))]
pub async fn start(config: &LoopioConfig) -> Result<(TokenManager, Arc<McpServer>), StartupError> {
    let manager = TokenManager::new(config.credentials.clone())?;

    manager.acquire_token().await?;
    info!("Acquired initial Loopio access token");

    manager.start_auto_refresh(config.refresh_interval)?;

    let server = build_server(config, Arc::new(manager.handle())).await?;
    info!(tools = server.list_tools().await.len(), "Loopio MCP server ready");

    Ok((manager, Arc::new(server)))
}

/// Run the server on stdio until stdin closes or Ctrl-C.
pub async fn run(config: LoopioConfig) -> Result<(), StartupError> {
    let (manager, server) = start(&config).await?;

    let outcome = tokio::select! {
        served = serve_stdio(server) => served,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    manager.stop_auto_refresh();
    info!("Loopio MCP server stopped");

    outcome.map_err(StartupError::from)
}

/// Drive `future` to completion on `runtime`, then drop the runtime without
/// waiting for blocking tasks.
///
/// Tokio reads stdin on a blocking thread that stays parked in `read` until
/// the next line arrives. Dropping the runtime normally would wait for it, so
/// the process would hang after Ctrl-C.
pub fn block_on_detached<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}
