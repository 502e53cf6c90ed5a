//! Loopio MCP tools
//!
//! Every tool is an [`EndpointTool`]: a definition, one row of the endpoint
//! table, an optional body builder and a rendering rule. The categories live
//! in submodules.

pub mod entries;
pub mod library;
pub mod projects;

pub use entries::entry_tools;
pub use library::library_tools;
pub use projects::project_tools;

use crate::clients::{ApiClient, ApiResponse, Endpoint};
use crate::models::Validate;
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{pretty_json, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Builds the request body from tool arguments.
pub type BodyBuilder = fn(&Value) -> McpServerResult<Option<Value>>;

/// Checks tool arguments that the endpoint table cannot express.
pub type ArgsValidator = fn(&Value) -> McpServerResult<()>;

/// How a successful response is turned into tool text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Pretty-printed JSON body.
    Json,
    /// `Successfully created <noun> with ID: <id>` followed by the JSON.
    CreatedWithId(&'static str),
    /// `Successfully created <noun>` followed by the JSON.
    Created(&'static str),
    /// `Successfully updated <noun> <args[arg]>` followed by the JSON.
    UpdatedById(&'static str, &'static str),
    /// `Successfully updated <noun>` followed by the JSON.
    Updated(&'static str),
    /// `Successfully deleted <noun> <args[arg]>`.
    Deleted(&'static str, &'static str),
    /// `Bulk create task accepted. Task ID: <taskId>`.
    BulkTask,
    /// `Project creation task accepted. Task ID: <taskId>, Project ID: <projectId>`.
    ProjectTask,
}

impl Render {
    /// Render the response for the given call arguments.
    pub fn render(&self, args: &Value, response: ApiResponse) -> String {
        let body = response.into_value();
        match *self {
            Render::Json => pretty_json(&body),
            Render::CreatedWithId(noun) => format!(
                "Successfully created {} with ID: {}\n\n{}",
                noun,
                display(&body["id"]),
                pretty_json(&body)
            ),
            Render::Created(noun) => {
                format!("Successfully created {}\n\n{}", noun, pretty_json(&body))
            }
            Render::UpdatedById(noun, arg) => format!(
                "Successfully updated {} {}\n\n{}",
                noun,
                display(&args[arg]),
                pretty_json(&body)
            ),
            Render::Updated(noun) => {
                format!("Successfully updated {}\n\n{}", noun, pretty_json(&body))
            }
            Render::Deleted(noun, arg) => {
                format!("Successfully deleted {} {}", noun, display(&args[arg]))
            }
            Render::BulkTask => format!(
                "Bulk create task accepted. Task ID: {}",
                display(&body["taskId"])
            ),
            Render::ProjectTask => format!(
                "Project creation task accepted. Task ID: {}, Project ID: {}",
                display(&body["taskId"]),
                display(&body["projectId"])
            ),
        }
    }
}

/// Scalar text of a JSON value; strings lose their quotes and missing values
/// read as `undefined`.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "undefined".to_string(),
        other => other.to_string(),
    }
}

/// A tool backed by one Loopio endpoint.
pub struct EndpointTool {
    definition: ToolDefinition,
    endpoint: Endpoint,
    client: Arc<ApiClient>,
    validator: Option<ArgsValidator>,
    body: Option<BodyBuilder>,
    render: Render,
}

impl EndpointTool {
    /// Read tool: no body, JSON rendering.
    pub fn new(client: Arc<ApiClient>, endpoint: Endpoint, definition: ToolDefinition) -> Self {
        Self {
            definition,
            endpoint,
            client,
            validator: None,
            body: None,
            render: Render::Json,
        }
    }

    /// Attach an argument check run before anything else.
    pub fn with_validator(mut self, validator: ArgsValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Attach a body builder.
    pub fn with_body(mut self, body: BodyBuilder) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the rendering rule.
    pub fn with_render(mut self, render: Render) -> Self {
        self.render = render;
        self
    }

    /// Endpoint this tool calls.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn into_tool(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait]
impl Tool for EndpointTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    #[instrument(skip(self, args, context), fields(tool = %self.definition.name, correlation_id = ?context.correlation_id))]
    async fn execute(&self, args: Value, context: &ToolContext) -> McpServerResult<ToolResult> {
        if let Some(validate) = self.validator {
            validate(&args)?;
        }

        let body = match self.body {
            Some(build) => build(&args)?,
            None => None,
        };

        let request = self
            .endpoint
            .request(&args, body)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;

        debug!("Calling {} {}", request.method.as_str(), request.path);

        match self.client.execute(request).await {
            Ok(response) => Ok(ToolResult::text(self.render.render(&args, response))),
            Err(e) => {
                error!("{} failed: {}", self.definition.name, e);
                Ok(ToolResult::error(e.to_string()))
            }
        }
    }
}

/// Deserialize tool arguments into a typed parameter struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: &Value) -> McpServerResult<T> {
    serde_json::from_value(args.clone()).map_err(|e| McpServerError::InvalidParams(e.to_string()))
}

/// Validate and serialize a request body.
pub(crate) fn body_of<T: Validate + Serialize>(body: &T) -> McpServerResult<Option<Value>> {
    body.validate()
        .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;
    serde_json::to_value(body)
        .map(Some)
        .map_err(|e| McpServerError::Internal(e.to_string()))
}

/// Object schema from a properties map and the required names.
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub(crate) fn integer(description: &str) -> Value {
    json!({ "type": "integer", "description": description })
}

pub(crate) fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

pub(crate) fn boolean(description: &str) -> Value {
    json!({ "type": "boolean", "description": description })
}

pub(crate) fn string_array(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

pub(crate) fn string_enum(values: &[&str], description: &str) -> Value {
    json!({ "type": "string", "enum": values, "description": description })
}

/// Schema of a JSON Patch operation list.
pub(crate) fn patch_operations() -> Value {
    json!({
        "type": "array",
        "description": "Array of JSON Patch operations",
        "items": {
            "type": "object",
            "properties": {
                "op": {
                    "type": "string",
                    "enum": ["add", "remove", "replace", "move", "copy", "test"],
                    "description": "JSON Patch operation"
                },
                "path": { "type": "string", "description": "JSON pointer to the field (e.g., '/answer/text', '/tags')" },
                "value": { "description": "Value for the operation" },
                "from": { "type": "string", "description": "Source path for move/copy operations" }
            },
            "required": ["op", "path"]
        }
    })
}

/// Get every Loopio tool.
pub fn all_tools(client: Arc<ApiClient>) -> Vec<Arc<dyn Tool>> {
    let mut tools = Vec::new();

    // Library, stacks, files, customers (14)
    tools.extend(library_tools(client.clone()));

    // Projects, compliance sets, participants, custom fields, templates (24)
    tools.extend(project_tools(client.clone()));

    // Project entries, sections, subsections (15)
    tools.extend(entry_tools(client));

    tools
}
