//! Project structure tools: entries, sections and subsections.

use super::{body_of, integer, object_schema, parse_args, string, string_array, EndpointTool, Render};
use crate::clients::endpoints::*;
use crate::clients::ApiClient;
use crate::models::{
    AnswerText, CreateProjectEntryRequest, CreateSectionRequest, CreateSubSectionRequest,
    UpdateProjectEntryRequest, UpdateSectionRequest,
};
use crate::server::{McpServerResult, Tool};
use crate::types::ToolDefinition;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::Arc;

/// Get all project structure tools.
pub fn entry_tools(client: Arc<ApiClient>) -> Vec<Arc<dyn Tool>> {
    endpoint_tools(client)
        .into_iter()
        .map(EndpointTool::into_tool)
        .collect()
}

fn nullable_string(description: &str) -> Value {
    json!({ "type": ["string", "null"], "description": description })
}

pub(crate) fn endpoint_tools(client: Arc<ApiClient>) -> Vec<EndpointTool> {
    vec![
        // Project entries
        EndpointTool::new(
            client.clone(),
            LIST_PROJECT_ENTRIES,
            ToolDefinition::new("listProjectEntries", "List the entries of a project").with_schema(
                object_schema(
                    json!({
                        "projectId": integer("Project ID"),
                        "sectionId": integer("Filter by section ID"),
                        "subSectionId": integer("Filter by subsection ID"),
                        "inline": string_array("Inline options"),
                        "page": integer("Page number"),
                        "pageSize": integer("Items per page")
                    }),
                    &["projectId"],
                ),
            ),
        ),
        EndpointTool::new(
            client.clone(),
            GET_PROJECT_ENTRY,
            ToolDefinition::new("getProjectEntry", "Get a project entry by ID").with_schema(object_schema(
                json!({
                    "projectEntryId": integer("Project Entry ID"),
                    "inline": string_array("Inline options")
                }),
                &["projectEntryId"],
            )),
        ),
        EndpointTool::new(
            client.clone(),
            CREATE_PROJECT_ENTRY,
            ToolDefinition::new("createProjectEntry", "Create a project entry").with_schema(object_schema(
                json!({
                    "projectId": integer("Project ID"),
                    "sectionId": integer("Section ID (provide either sectionId or subSectionId)"),
                    "subSectionId": integer("SubSection ID (provide either sectionId or subSectionId)"),
                    "question": string("Entry question text"),
                    "answerText": nullable_string("Answer text")
                }),
                &["projectId", "question"],
            )),
        )
        .with_body(create_entry_body)
        .with_render(Render::Created("project entry")),
        EndpointTool::new(
            client.clone(),
            UPDATE_PROJECT_ENTRY,
            ToolDefinition::new("updateProjectEntry", "Update a project entry").with_schema(object_schema(
                json!({
                    "projectEntryId": integer("Project Entry ID"),
                    "question": string("Updated question text"),
                    "answerText": nullable_string("Updated answer text")
                }),
                &["projectEntryId"],
            )),
        )
        .with_body(update_entry_body)
        .with_render(Render::Updated("project entry")),
        EndpointTool::new(
            client.clone(),
            DELETE_PROJECT_ENTRY,
            ToolDefinition::new("deleteProjectEntry", "Delete a project entry").with_schema(object_schema(
                json!({ "projectEntryId": integer("Project Entry ID to delete") }),
                &["projectEntryId"],
            )),
        )
        .with_render(Render::Deleted("project entry", "projectEntryId")),
        // Sections
        EndpointTool::new(
            client.clone(),
            LIST_SECTIONS,
            ToolDefinition::new("listProjectSections", "List the sections of a project").with_schema(
                object_schema(
                    json!({
                        "projectId": integer("Project ID"),
                        "page": integer("Page number"),
                        "pageSize": integer("Items per page")
                    }),
                    &["projectId"],
                ),
            ),
        ),
        EndpointTool::new(
            client.clone(),
            GET_SECTION,
            ToolDefinition::new("getProjectSection", "Get a section by ID")
                .with_schema(object_schema(json!({ "sectionId": integer("Section ID") }), &["sectionId"])),
        ),
        EndpointTool::new(
            client.clone(),
            CREATE_SECTION,
            ToolDefinition::new("createProjectSection", "Create a section in a project").with_schema(
                object_schema(
                    json!({
                        "projectId": integer("Project ID"),
                        "name": string("Section name"),
                        "position": integer("Section position")
                    }),
                    &["projectId", "name"],
                ),
            ),
        )
        .with_body(create_section_body)
        .with_render(Render::Created("section")),
        EndpointTool::new(
            client.clone(),
            UPDATE_SECTION,
            ToolDefinition::new("updateProjectSection", "Rename or move a section").with_schema(
                object_schema(
                    json!({
                        "sectionId": integer("Section ID"),
                        "name": string("Updated section name"),
                        "position": integer("Updated section position")
                    }),
                    &["sectionId"],
                ),
            ),
        )
        .with_body(update_section_body)
        .with_render(Render::Updated("section")),
        EndpointTool::new(
            client.clone(),
            DELETE_SECTION,
            ToolDefinition::new("deleteProjectSection", "Delete a section").with_schema(object_schema(
                json!({ "sectionId": integer("Section ID to delete") }),
                &["sectionId"],
            )),
        )
        .with_render(Render::Deleted("section", "sectionId")),
        // Subsections
        EndpointTool::new(
            client.clone(),
            LIST_SUB_SECTIONS,
            ToolDefinition::new("listProjectSubSections", "List the subsections of a project").with_schema(
                object_schema(
                    json!({
                        "projectId": integer("Project ID"),
                        "sectionId": integer("Filter by section ID"),
                        "page": integer("Page number"),
                        "pageSize": integer("Items per page")
                    }),
                    &["projectId"],
                ),
            ),
        ),
        EndpointTool::new(
            client.clone(),
            GET_SUB_SECTION,
            ToolDefinition::new("getProjectSubSection", "Get a subsection by ID").with_schema(object_schema(
                json!({ "subSectionId": integer("SubSection ID") }),
                &["subSectionId"],
            )),
        ),
        EndpointTool::new(
            client.clone(),
            CREATE_SUB_SECTION,
            ToolDefinition::new("createProjectSubSection", "Create a subsection under a section")
                .with_schema(object_schema(
                    json!({
                        "projectId": integer("Project ID"),
                        "sectionId": integer("Section ID"),
                        "name": string("SubSection name"),
                        "position": integer("SubSection position")
                    }),
                    &["projectId", "sectionId", "name"],
                )),
        )
        .with_body(create_sub_section_body)
        .with_render(Render::Created("subsection")),
        EndpointTool::new(
            client.clone(),
            UPDATE_SUB_SECTION,
            ToolDefinition::new("updateProjectSubSection", "Rename or move a subsection").with_schema(
                object_schema(
                    json!({
                        "subSectionId": integer("SubSection ID"),
                        "name": string("Updated subsection name"),
                        "position": integer("Updated subsection position")
                    }),
                    &["subSectionId"],
                ),
            ),
        )
        .with_body(update_section_body)
        .with_render(Render::Updated("subsection")),
        EndpointTool::new(
            client,
            DELETE_SUB_SECTION,
            ToolDefinition::new("deleteProjectSubSection", "Delete a subsection").with_schema(object_schema(
                json!({ "subSectionId": integer("SubSection ID to delete") }),
                &["subSectionId"],
            )),
        )
        .with_render(Render::Deleted("subsection", "subSectionId")),
    ]
}

/// Distinguishes an absent `answerText` (`None`) from an explicit null
/// (`Some(None)`).
fn explicit<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEntryParams {
    project_id: i64,
    #[serde(default)]
    section_id: Option<i64>,
    #[serde(default)]
    sub_section_id: Option<i64>,
    question: String,
    #[serde(default, deserialize_with = "explicit")]
    answer_text: Option<Option<String>>,
}

fn create_entry_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: CreateEntryParams = parse_args(args)?;
    body_of(&CreateProjectEntryRequest {
        project_id: params.project_id,
        section_id: params.section_id,
        sub_section_id: params.sub_section_id,
        question: params.question,
        answer: params.answer_text.map(|text| AnswerText { text }),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEntryParams {
    #[serde(default)]
    question: Option<String>,
    #[serde(default, deserialize_with = "explicit")]
    answer_text: Option<Option<String>>,
}

fn update_entry_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: UpdateEntryParams = parse_args(args)?;
    body_of(&UpdateProjectEntryRequest {
        question: params.question,
        answer: params.answer_text.map(|text| AnswerText { text }),
    })
}

fn create_section_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: CreateSectionRequest = parse_args(args)?;
    body_of(&params)
}

fn create_sub_section_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: CreateSubSectionRequest = parse_args(args)?;
    body_of(&params)
}

/// Shared by sections and subsections; only the supplied fields are sent.
fn update_section_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: UpdateSectionRequest = parse_args(args)?;
    body_of(&params)
}
