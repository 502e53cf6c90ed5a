//! Loopio resources and prompts.

use crate::clients::endpoints::GET_LIBRARY_ENTRY;
use crate::clients::ApiClient;
use crate::server::{McpServerError, McpServerResult, Prompt, ResourceHandler};
use crate::types::{
    pretty_json, PromptArgument, PromptDefinition, PromptMessage, ResourceContents,
    ResourceTemplate,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, instrument};

/// URI template of a library entry.
pub const LIBRARY_ENTRY_TEMPLATE: &str = "loopio://libraryEntry/{id}";

const JSON_MIME: &str = "application/json";

/// Exposes library entries as `loopio://libraryEntry/{id}`.
pub struct LibraryEntryResource {
    client: Arc<ApiClient>,
}

impl LibraryEntryResource {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for LibraryEntryResource {
    fn template(&self) -> ResourceTemplate {
        ResourceTemplate::new(LIBRARY_ENTRY_TEMPLATE, "libraryEntry")
            .with_description("A Loopio library entry as JSON")
            .with_mime_type(JSON_MIME)
    }

    #[instrument(skip(self, vars))]
    async fn read(
        &self,
        uri: &str,
        vars: HashMap<String, String>,
    ) -> McpServerResult<Vec<ResourceContents>> {
        let id: i64 = vars
            .get("id")
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| McpServerError::InvalidParams(format!("invalid library entry id in {}", uri)))?;

        let request = GET_LIBRARY_ENTRY
            .request(&json!({ "libraryEntryId": id }), None)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;

        let entry = self.client.execute(request).await.map_err(|e| {
            error!("Failed to read library entry {}: {}", id, e);
            McpServerError::ExecutionError(e.to_string())
        })?;

        Ok(vec![ResourceContents {
            uri: uri.to_string(),
            mime_type: Some(JSON_MIME.to_string()),
            text: pretty_json(&entry.into_value()),
        }])
    }
}

/// Steers the agent towards `listLibraryEntries` for a free-text query.
pub struct SearchLibraryEntriesPrompt;

impl Prompt for SearchLibraryEntriesPrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "searchLibraryEntries".to_string(),
            description: Some("Search the Loopio library for entries related to a query".to_string()),
            arguments: vec![PromptArgument {
                name: "query".to_string(),
                description: Some("Search query for library entries".to_string()),
                required: true,
            }],
        }
    }

    fn render(&self, args: &HashMap<String, String>) -> McpServerResult<Vec<PromptMessage>> {
        let query = args
            .get("query")
            .ok_or_else(|| McpServerError::InvalidParams("Missing required argument: query".to_string()))?;

        Ok(vec![PromptMessage::user(format!(
            "Please search the Loopio library for entries related to: \"{}\". \
             Use the listLibraryEntries tool with appropriate filters.",
            query
        ))])
    }
}
