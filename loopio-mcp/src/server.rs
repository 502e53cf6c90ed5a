//! MCP server implementation
//!
//! This module provides the MCP server that exposes the Loopio tools,
//! resource templates and prompts to an AI agent.

use crate::types::*;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// MCP server error types.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Resource URI matched no template
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Prompt not found
    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    /// Tool execution failed
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<McpServerError> for McpError {
    fn from(err: McpServerError) -> Self {
        match err {
            McpServerError::ToolNotFound(_)
            | McpServerError::ResourceNotFound(_)
            | McpServerError::PromptNotFound(_)
            | McpServerError::InvalidParams(_) => McpError::invalid_params(err.to_string()),
            McpServerError::ExecutionError(_) | McpServerError::Internal(_) => {
                McpError::internal_error(err.to_string())
            }
        }
    }
}

/// Result type for MCP server operations.
pub type McpServerResult<T> = Result<T, McpServerError>;

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given arguments.
    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult>;
}

/// Trait for parameterized resources.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Template this handler serves.
    fn template(&self) -> ResourceTemplate;

    /// Read the resource at `uri`; `vars` holds the template variables.
    async fn read(
        &self,
        uri: &str,
        vars: HashMap<String, String>,
    ) -> McpServerResult<Vec<ResourceContents>>;
}

/// Trait for prompt templates.
pub trait Prompt: Send + Sync {
    fn definition(&self) -> PromptDefinition;

    /// Render the prompt messages for the given arguments.
    fn render(&self, args: &HashMap<String, String>) -> McpServerResult<Vec<PromptMessage>>;
}

/// Context for tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// JSON-RPC id of the call, for log correlation
    pub correlation_id: Option<String>,
}

impl ToolContext {
    /// Create an empty context.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context correlated with a JSON-RPC request id.
    pub fn for_request(id: &RequestId) -> Self {
        let correlation_id = match id {
            RequestId::String(s) => Some(s.clone()),
            RequestId::Number(n) => Some(n.to_string()),
            RequestId::Null => None,
        };
        Self { correlation_id }
    }
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: HashMap<String, String>,
}

/// MCP server.
///
/// Holds the registries and answers JSON-RPC requests. Handlers never hold a
/// registry lock across a Loopio call except the read lock on tools, so
/// concurrent calls do not serialize.
pub struct McpServer {
    /// Server info
    info: ServerInfo,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tools
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,

    /// Registered resource templates, matched in registration order
    templates: Arc<RwLock<Vec<Arc<dyn ResourceHandler>>>>,

    /// Registered prompts
    prompts: Arc<RwLock<HashMap<String, Arc<dyn Prompt>>>>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities::default()),
                resources: Some(ResourceCapabilities::default()),
                prompts: Some(PromptCapabilities::default()),
            },
            tools: Arc::new(RwLock::new(HashMap::new())),
            templates: Arc::new(RwLock::new(Vec::new())),
            prompts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create with the Loopio server identity.
    pub fn loopio() -> Self {
        Self::new("loopio-mcp", env!("CARGO_PKG_VERSION"))
    }

    /// Register a tool. A tool with the same name is replaced.
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        let mut tools = self.tools.write().await;
        if tools.insert(name.clone(), tool).is_some() {
            warn!("Replaced previously registered tool {}", name);
        }
    }

    /// Register multiple tools.
    pub async fn register_tools(&self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register_tool(tool).await;
        }
    }

    /// Register a resource template handler.
    pub async fn register_resource_template(&self, handler: Arc<dyn ResourceHandler>) {
        self.templates.write().await.push(handler);
    }

    /// Register a prompt.
    pub async fn register_prompt(&self, prompt: Arc<dyn Prompt>) {
        let name = prompt.definition().name;
        self.prompts.write().await.insert(name, prompt);
    }

    /// Get all tool definitions, sorted by name.
    pub async fn list_tools(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().await;
        let mut definitions: Vec<_> = tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Get all resource templates.
    pub async fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        let templates = self.templates.read().await;
        templates.iter().map(|h| h.template()).collect()
    }

    /// Get all prompt definitions, sorted by name.
    pub async fn list_prompts(&self) -> Vec<PromptDefinition> {
        let prompts = self.prompts.read().await;
        let mut definitions: Vec<_> = prompts.values().map(|p| p.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let tool = {
            let tools = self.tools.read().await;
            tools
                .get(name)
                .cloned()
                .ok_or_else(|| McpServerError::ToolNotFound(name.to_string()))?
        };

        tool.execute(arguments, context).await
    }

    /// Read a resource through the first template that matches `uri`.
    pub async fn read_resource(&self, uri: &str) -> McpServerResult<Vec<ResourceContents>> {
        let matched = {
            let templates = self.templates.read().await;
            templates.iter().find_map(|handler| {
                handler
                    .template()
                    .match_uri(uri)
                    .map(|vars| (handler.clone(), vars))
            })
        };

        let (handler, vars) =
            matched.ok_or_else(|| McpServerError::ResourceNotFound(uri.to_string()))?;
        handler.read(uri, vars).await
    }

    /// Render a prompt.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> McpServerResult<(PromptDefinition, Vec<PromptMessage>)> {
        let prompt = {
            let prompts = self.prompts.read().await;
            prompts
                .get(name)
                .cloned()
                .ok_or_else(|| McpServerError::PromptNotFound(name.to_string()))?
        };

        let definition = prompt.definition();
        for argument in definition.arguments.iter().filter(|a| a.required) {
            if !arguments.contains_key(&argument.name) {
                return Err(McpServerError::InvalidParams(format!(
                    "Missing required argument: {}",
                    argument.name
                )));
            }
        }

        let messages = prompt.render(arguments)?;
        Ok((definition, messages))
    }

    /// Handle an MCP request. Notifications yield no response.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        let id = match request.id {
            Some(id) => id,
            None => {
                debug!("Received notification {}", request.method);
                return None;
            }
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id).await,
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => self.handle_resources_list(id),
            "resources/templates/list" => self.handle_resource_templates_list(id).await,
            "resources/read" => self.handle_resources_read(id, request.params).await,
            "prompts/list" => self.handle_prompts_list(id).await,
            "prompts/get" => self.handle_prompts_get(id, request.params).await,
            _ => McpResponse::error(id, McpError::method_not_found(&request.method)),
        };

        Some(response)
    }

    fn handle_initialize(&self, id: RequestId) -> McpResponse {
        McpResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": self.capabilities,
                "serverInfo": self.info
            }),
        )
    }

    async fn handle_tools_list(&self, id: RequestId) -> McpResponse {
        let tools = self.list_tools().await;
        McpResponse::success(id, serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let call: ToolCall = match parse_params(params) {
            Ok(c) => c,
            Err(e) => return McpResponse::error(id, e),
        };

        let context = ToolContext::for_request(&id);

        match self.call_tool(&call.name, call.arguments, &context).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => McpResponse::success(id, value),
                Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
            },
            Err(e) => McpResponse::error(id, e.into()),
        }
    }

    // Library entries are only reachable through the template.
    fn handle_resources_list(&self, id: RequestId) -> McpResponse {
        McpResponse::success(id, serde_json::json!({ "resources": [] }))
    }

    async fn handle_resource_templates_list(&self, id: RequestId) -> McpResponse {
        let templates = self.list_resource_templates().await;
        McpResponse::success(id, serde_json::json!({ "resourceTemplates": templates }))
    }

    async fn handle_resources_read(
        &self,
        id: RequestId,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params: ReadResourceParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return McpResponse::error(id, e),
        };

        match self.read_resource(&params.uri).await {
            Ok(contents) => McpResponse::success(id, serde_json::json!({ "contents": contents })),
            Err(e) => McpResponse::error(id, e.into()),
        }
    }

    async fn handle_prompts_list(&self, id: RequestId) -> McpResponse {
        let prompts = self.list_prompts().await;
        McpResponse::success(id, serde_json::json!({ "prompts": prompts }))
    }

    async fn handle_prompts_get(
        &self,
        id: RequestId,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params: GetPromptParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return McpResponse::error(id, e),
        };

        match self.get_prompt(&params.name, &params.arguments).await {
            Ok((definition, messages)) => McpResponse::success(
                id,
                serde_json::json!({
                    "description": definition.description,
                    "messages": messages
                }),
            ),
            Err(e) => McpResponse::error(id, e.into()),
        }
    }

    /// Get server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Get server capabilities.
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }
}

fn parse_params<T>(params: Option<serde_json::Value>) -> Result<T, McpError>
where
    T: serde::de::DeserializeOwned,
{
    let params = params.ok_or_else(|| McpError::invalid_params("Missing params"))?;
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string()))
}
