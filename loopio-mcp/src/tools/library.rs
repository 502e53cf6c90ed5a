//! Library tools
//!
//! Library entries, their attachments and history, plus the smaller
//! stack, file and customer lookups.

use super::{
    body_of, boolean, integer, object_schema, parse_args, patch_operations, string, string_array,
    EndpointTool, Render,
};
use crate::clients::endpoints::*;
use crate::clients::ApiClient;
use crate::models::{
    AnswerText, CreateLibraryEntryRequest, EntryLocation, IdRef, JsonPatchOperation,
    LibrarySearchFilter, QuestionText,
};
use crate::server::{McpServerResult, Tool};
use crate::types::ToolDefinition;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Get all library tools.
pub fn library_tools(client: Arc<ApiClient>) -> Vec<Arc<dyn Tool>> {
    endpoint_tools(client)
        .into_iter()
        .map(EndpointTool::into_tool)
        .collect()
}

pub(crate) fn endpoint_tools(client: Arc<ApiClient>) -> Vec<EndpointTool> {
    vec![
        EndpointTool::new(
            client.clone(),
            LIST_LIBRARY_ENTRIES,
            ToolDefinition::new("listLibraryEntries", "List and search library entries").with_schema(
                object_schema(
                    json!({
                        "page": integer("Page number (default: 1)"),
                        "pageSize": { "type": "integer", "minimum": 1, "maximum": 200, "description": "Number of items per page (default: 10, max: 200)" },
                        "filter": {
                            "type": "object",
                            "description": "Filter options for library entries",
                            "properties": {
                                "searchQuery": string("Search query text"),
                                "language": string("Language code (e.g., 'en')"),
                                "lastUpdatedDate": {
                                    "type": "object",
                                    "properties": {
                                        "gte": string("Greater than or equal to date (ISO 8601)"),
                                        "lte": string("Less than or equal to date (ISO 8601)")
                                    }
                                },
                                "hasAttachment": boolean("Filter entries with attachments"),
                                "searchInQuestions": boolean("Search within questions"),
                                "searchInAnswers": boolean("Search within answers"),
                                "searchInTags": boolean("Search within tags")
                            }
                        }
                    }),
                    &[],
                ),
            ),
        )
        .with_validator(check_library_filter),
        EndpointTool::new(
            client.clone(),
            GET_LIBRARY_ENTRY,
            ToolDefinition::new("getLibraryEntry", "Get a library entry by ID").with_schema(object_schema(
                json!({
                    "libraryEntryId": integer("Library Entry ID"),
                    "inlineMergeVariables": boolean("Substitute merge variable placeholders")
                }),
                &["libraryEntryId"],
            )),
        ),
        EndpointTool::new(
            client.clone(),
            CREATE_LIBRARY_ENTRY,
            ToolDefinition::new("createLibraryEntry", "Create a new library entry")
                .with_schema(object_schema(library_entry_properties(), &["questions", "answerText", "stackId"])),
        )
        .with_body(create_library_entry_body)
        .with_render(Render::CreatedWithId("library entry")),
        EndpointTool::new(
            client.clone(),
            UPDATE_LIBRARY_ENTRY,
            ToolDefinition::new("updateLibraryEntry", "Update a library entry with JSON Patch operations")
                .with_schema(object_schema(
                    json!({
                        "libraryEntryId": integer("Library Entry ID to update"),
                        "operations": patch_operations()
                    }),
                    &["libraryEntryId", "operations"],
                )),
        )
        .with_body(patch_body)
        .with_render(Render::UpdatedById("library entry", "libraryEntryId")),
        EndpointTool::new(
            client.clone(),
            DELETE_LIBRARY_ENTRY,
            ToolDefinition::new("deleteLibraryEntry", "Delete a library entry").with_schema(object_schema(
                json!({ "libraryEntryId": integer("Library Entry ID to delete") }),
                &["libraryEntryId"],
            )),
        )
        .with_render(Render::Deleted("library entry", "libraryEntryId")),
        EndpointTool::new(
            client.clone(),
            GET_LIBRARY_ENTRY_ATTACHMENTS,
            ToolDefinition::new("getLibraryEntryAttachments", "List the attachments of a library entry")
                .with_schema(object_schema(
                    json!({ "libraryEntryId": integer("Library Entry ID") }),
                    &["libraryEntryId"],
                )),
        ),
        EndpointTool::new(
            client.clone(),
            LIST_LIBRARY_ENTRY_HISTORIES,
            ToolDefinition::new("getLibraryEntryHistory", "List the revision history of a library entry")
                .with_schema(object_schema(
                    json!({
                        "libraryEntryId": integer("Library Entry ID"),
                        "page": integer("Page number"),
                        "pageSize": integer("Items per page")
                    }),
                    &["libraryEntryId"],
                )),
        ),
        EndpointTool::new(
            client.clone(),
            GET_LIBRARY_ENTRY_HISTORY,
            ToolDefinition::new("getLibraryEntryHistoryItem", "Get one revision of a library entry")
                .with_schema(object_schema(
                    json!({
                        "libraryEntryId": integer("Library Entry ID"),
                        "historyId": integer("History Item ID")
                    }),
                    &["libraryEntryId", "historyId"],
                )),
        ),
        EndpointTool::new(
            client.clone(),
            BULK_CREATE_LIBRARY_ENTRIES,
            ToolDefinition::new("bulkCreateLibraryEntries", "Create many library entries in one asynchronous task")
                .with_schema(object_schema(
                    json!({
                        "entries": {
                            "type": "array",
                            "description": "Array of library entries to create",
                            "items": object_schema(library_entry_properties(), &["questions", "answerText", "stackId"])
                        }
                    }),
                    &["entries"],
                )),
        )
        .with_body(bulk_create_body)
        .with_render(Render::BulkTask),
        // Stacks
        EndpointTool::new(
            client.clone(),
            LIST_STACKS,
            ToolDefinition::new("listStacks", "List library stacks").with_schema(object_schema(
                json!({ "fields": string("Fields to include (e.g., '@wide' for full structure)") }),
                &[],
            )),
        ),
        // Files
        EndpointTool::new(
            client.clone(),
            SHOW_FILE,
            ToolDefinition::new("showFile", "Get file metadata")
                .with_schema(object_schema(json!({ "fileId": integer("File ID") }), &["fileId"])),
        ),
        EndpointTool::new(
            client.clone(),
            DELETE_FILE,
            ToolDefinition::new("deleteFile", "Delete a file")
                .with_schema(object_schema(json!({ "fileId": integer("File ID to delete") }), &["fileId"])),
        )
        .with_render(Render::Deleted("file", "fileId")),
        // Customers
        EndpointTool::new(
            client.clone(),
            GET_CUSTOMER,
            ToolDefinition::new("getCustomer", "Get a customer account")
                .with_schema(object_schema(json!({ "customerId": integer("Customer ID") }), &["customerId"])),
        ),
        EndpointTool::new(
            client,
            GET_CUSTOMER_ACTIVE_LANGUAGES,
            ToolDefinition::new("getCustomerActiveLanguages", "List the active languages of a customer")
                .with_schema(object_schema(json!({ "customerId": integer("Customer ID") }), &["customerId"])),
        ),
    ]
}

fn library_entry_properties() -> Value {
    json!({
        "questions": {
            "type": "array",
            "minItems": 1,
            "description": "Array of questions for this entry",
            "items": {
                "type": "object",
                "properties": { "text": string("Question text") },
                "required": ["text"]
            }
        },
        "answerText": { "type": ["string", "null"], "description": "Answer text (can be null if using compliance answers)" },
        "stackId": integer("Stack ID for the library location"),
        "categoryId": integer("Category ID (optional)"),
        "subCategoryId": integer("SubCategory ID (optional)"),
        "languageCode": string("Language code (default: 'en')"),
        "tags": string_array("Array of tag strings")
    })
}

#[derive(Debug, Deserialize)]
struct ListLibraryEntriesParams {
    #[serde(default)]
    filter: Option<LibrarySearchFilter>,
}

fn check_library_filter(args: &Value) -> McpServerResult<()> {
    let params: ListLibraryEntriesParams = parse_args(args)?;
    debug!(filtered = params.filter.is_some(), "Listing library entries");
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryEntryParams {
    questions: Vec<QuestionText>,
    #[serde(default)]
    answer_text: Option<String>,
    stack_id: i64,
    #[serde(default)]
    category_id: Option<i64>,
    #[serde(default)]
    sub_category_id: Option<i64>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl From<LibraryEntryParams> for CreateLibraryEntryRequest {
    fn from(params: LibraryEntryParams) -> Self {
        Self {
            questions: params.questions,
            answer: AnswerText {
                text: params.answer_text,
            },
            language_code: params.language_code,
            location: EntryLocation {
                stack: IdRef::new(params.stack_id),
                category: params.category_id.map(IdRef::new),
                sub_category: params.sub_category_id.map(IdRef::new),
            },
            tags: params.tags,
        }
    }
}

fn create_library_entry_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: LibraryEntryParams = parse_args(args)?;
    body_of(&CreateLibraryEntryRequest::from(params))
}

#[derive(Debug, Deserialize)]
struct BulkCreateParams {
    entries: Vec<LibraryEntryParams>,
}

fn bulk_create_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: BulkCreateParams = parse_args(args)?;
    let entries: Vec<CreateLibraryEntryRequest> =
        params.entries.into_iter().map(Into::into).collect();
    body_of(&entries)
}

#[derive(Debug, Deserialize)]
struct PatchParams {
    operations: Vec<JsonPatchOperation>,
}

/// JSON Patch body shared by every `operations` tool.
pub(crate) fn patch_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: PatchParams = parse_args(args)?;
    body_of(&params.operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ContentType;
    use crate::server::McpServerError;
    use crate::tools::tests::client;

    fn tool(name: &str) -> EndpointTool {
        endpoint_tools(client())
            .into_iter()
            .find(|t| t.definition.name == name)
            .unwrap()
    }

    #[test]
    fn test_create_library_entry_body() {
        let body = create_library_entry_body(&json!({
            "questions": [{"text": "Is data encrypted?"}],
            "answerText": null,
            "stackId": 3,
            "categoryId": 4,
            "tags": ["security"]
        }))
        .unwrap()
        .unwrap();

        assert_eq!(
            body,
            json!({
                "questions": [{"text": "Is data encrypted?"}],
                "answer": {"text": null},
                "location": {"stack": {"id": 3}, "category": {"id": 4}},
                "tags": ["security"]
            })
        );
    }

    #[test]
    fn test_create_library_entry_requires_questions() {
        let err = create_library_entry_body(&json!({
            "questions": [],
            "answerText": "x",
            "stackId": 3
        }))
        .unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));
    }

    #[test]
    fn test_bulk_body_is_an_array() {
        let body = bulk_create_body(&json!({
            "entries": [
                {"questions": [{"text": "A"}], "answerText": "a", "stackId": 1},
                {"questions": [{"text": "B"}], "answerText": "b", "stackId": 1, "languageCode": "fr"}
            ]
        }))
        .unwrap()
        .unwrap();

        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["languageCode"], "fr");
    }

    #[test]
    fn test_patch_body_is_verbatim() {
        let operations = json!([
            {"op": "replace", "path": "/answer/text", "value": "New"},
            {"op": "remove", "path": "/tags/0"}
        ]);
        let body = patch_body(&json!({"libraryEntryId": 1, "operations": operations.clone()}))
            .unwrap()
            .unwrap();
        assert_eq!(body, operations);
    }

    #[test]
    fn test_patch_body_rejects_bad_operation() {
        let err = patch_body(&json!({"operations": [{"op": "copy", "path": "/a"}]})).unwrap_err();
        assert!(err.to_string().contains("[0].from"));
    }

    #[test]
    fn test_filter_type_checked() {
        assert!(check_library_filter(&json!({"filter": {"hasAttachment": "yes"}})).is_err());
        assert!(check_library_filter(&json!({"filter": {"hasAttachment": true}})).is_ok());
        assert!(check_library_filter(&json!({})).is_ok());
    }

    #[test]
    fn test_update_uses_json_patch() {
        let update = tool("updateLibraryEntry");
        assert_eq!(update.endpoint().content_type, ContentType::JsonPatch);
        assert_eq!(update.render, Render::UpdatedById("library entry", "libraryEntryId"));
    }
}
