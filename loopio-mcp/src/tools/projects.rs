//! Project tools
//!
//! Projects and everything hanging directly off them: compliance sets,
//! participants, source documents, custom field values and templates. Custom
//! project field definitions are account-wide but live here too.

use super::library::patch_body;
use super::{
    body_of, boolean, integer, object_schema, parse_args, patch_operations, string, string_array,
    string_enum, EndpointTool, Render,
};
use crate::clients::endpoints::*;
use crate::clients::ApiClient;
use crate::models::{
    ComplianceOption, ComplianceSetRequest, CreateCustomProjectFieldRequest,
    CreateProjectRequest, CustomProjectFieldType, IdRef, ParticipantReference, ProjectType,
    UpdateProjectRequest, Validate, ValidationError,
};
use crate::server::{McpServerError, McpServerResult, Tool};
use crate::types::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Get all project tools.
pub fn project_tools(client: Arc<ApiClient>) -> Vec<Arc<dyn Tool>> {
    endpoint_tools(client)
        .into_iter()
        .map(EndpointTool::into_tool)
        .collect()
}

fn project_id_schema(description: &str) -> Value {
    object_schema(json!({ "projectId": integer(description) }), &["projectId"])
}

fn compliance_set_properties() -> Value {
    json!({
        "projectId": integer("Project ID"),
        "complianceSetId": integer("Compliance Set ID"),
        "label": string("Compliance set label"),
        "shortName": { "type": "string", "minLength": 1, "description": "Short name (min 1 character)" },
        "options": {
            "type": "array",
            "description": "Compliance options",
            "items": {
                "type": "object",
                "properties": { "label": string("Option label") },
                "required": ["label"]
            }
        }
    })
}

fn new_project_properties() -> Value {
    json!({
        "name": string("Project name"),
        "projectType": string_enum(&ProjectType::ALL, "Project type"),
        "companyName": string("Company name"),
        "dueDate": string("Due date (ISO 8601 format)"),
        "description": string("Project description"),
        "ownerId": integer("Owner user ID")
    })
}

pub(crate) fn endpoint_tools(client: Arc<ApiClient>) -> Vec<EndpointTool> {
    let mut create_project = new_project_properties();
    create_project["customProjectFieldValues"] = json!({
        "type": "object",
        "additionalProperties": { "type": "string" },
        "description": "Custom field values"
    });
    create_project["mergeVariableValues"] = json!({
        "type": "object",
        "additionalProperties": { "type": "string" },
        "description": "Merge variable values"
    });

    let mut from_template = new_project_properties();
    from_template["projectTemplateId"] = integer("Project Template ID");

    let mut create_compliance_set = compliance_set_properties();
    if let Some(properties) = create_compliance_set.as_object_mut() {
        properties.remove("complianceSetId");
    }

    vec![
        EndpointTool::new(
            client.clone(),
            LIST_PROJECTS,
            ToolDefinition::new("listProjects", "List projects").with_schema(object_schema(
                json!({
                    "page": integer("Page number"),
                    "pageSize": integer("Items per page"),
                    "rfxTypes": {
                        "type": "array",
                        "items": { "type": "string", "enum": ProjectType::ALL },
                        "description": "Filter by project types (RFP, RFI, DDQ, SQ, PP, OTHER)"
                    },
                    "owners": { "type": "array", "items": { "type": "integer" }, "description": "Filter by owner IDs" }
                }),
                &[],
            )),
        )
        .with_validator(check_project_filter),
        EndpointTool::new(
            client.clone(),
            GET_PROJECT,
            ToolDefinition::new("getProject", "Get a project by ID").with_schema(object_schema(
                json!({
                    "projectId": integer("Project ID"),
                    "fields": string("Fields to include in response")
                }),
                &["projectId"],
            )),
        ),
        EndpointTool::new(
            client.clone(),
            CREATE_PROJECT,
            ToolDefinition::new("createProject", "Create a new project").with_schema(object_schema(
                create_project,
                &["name", "projectType", "companyName", "dueDate"],
            )),
        )
        .with_body(create_project_body)
        .with_render(Render::CreatedWithId("project")),
        EndpointTool::new(
            client.clone(),
            UPDATE_PROJECT,
            ToolDefinition::new("updateProject", "Change the status of a project").with_schema(object_schema(
                json!({
                    "projectId": integer("Project ID"),
                    "status": string("New project status")
                }),
                &["projectId", "status"],
            )),
        )
        .with_body(update_project_body)
        .with_render(Render::UpdatedById("project", "projectId")),
        EndpointTool::new(
            client.clone(),
            DELETE_PROJECT,
            ToolDefinition::new("deleteProject", "Delete a project")
                .with_schema(project_id_schema("Project ID to delete")),
        )
        .with_render(Render::Deleted("project", "projectId")),
        EndpointTool::new(
            client.clone(),
            GET_PROJECT_SUMMARY,
            ToolDefinition::new("getProjectSummary", "Get the summary of a project")
                .with_schema(project_id_schema("Project ID")),
        ),
        EndpointTool::new(
            client.clone(),
            LIST_PROJECT_SUMMARIES,
            ToolDefinition::new("getProjectSummaryList", "List summaries of recently updated projects")
                .with_schema(object_schema(
                    json!({ "lastUpdatedDateGt": string("Get projects updated after this date (ISO 8601)") }),
                    &["lastUpdatedDateGt"],
                )),
        ),
        // Compliance sets
        EndpointTool::new(
            client.clone(),
            LIST_COMPLIANCE_SETS,
            ToolDefinition::new("getProjectComplianceSets", "List the compliance sets of a project")
                .with_schema(project_id_schema("Project ID")),
        ),
        EndpointTool::new(
            client.clone(),
            GET_COMPLIANCE_SET,
            ToolDefinition::new("getProjectComplianceSet", "Get one compliance set of a project")
                .with_schema(object_schema(
                    json!({
                        "projectId": integer("Project ID"),
                        "complianceSetId": integer("Compliance Set ID")
                    }),
                    &["projectId", "complianceSetId"],
                )),
        ),
        EndpointTool::new(
            client.clone(),
            CREATE_COMPLIANCE_SET,
            ToolDefinition::new("createComplianceSet", "Create a compliance set on a project").with_schema(
                object_schema(create_compliance_set, &["projectId", "label", "shortName", "options"]),
            ),
        )
        .with_body(compliance_set_body)
        .with_render(Render::Created("compliance set")),
        EndpointTool::new(
            client.clone(),
            UPDATE_COMPLIANCE_SET,
            ToolDefinition::new("updateProjectComplianceSet", "Replace a compliance set of a project")
                .with_schema(object_schema(
                    compliance_set_properties(),
                    &["projectId", "complianceSetId", "label", "shortName", "options"],
                )),
        )
        .with_body(compliance_set_body)
        .with_render(Render::Updated("compliance set")),
        EndpointTool::new(
            client.clone(),
            DELETE_COMPLIANCE_SET,
            ToolDefinition::new("deleteProjectComplianceSet", "Delete a compliance set of a project")
                .with_schema(object_schema(
                    json!({
                        "projectId": integer("Project ID"),
                        "complianceSetId": integer("Compliance Set ID to delete")
                    }),
                    &["projectId", "complianceSetId"],
                )),
        )
        .with_render(Render::Deleted("compliance set", "complianceSetId")),
        // Participants and source documents
        EndpointTool::new(
            client.clone(),
            GET_PROJECT_PARTICIPANTS,
            ToolDefinition::new("getProjectParticipants", "List the participants of a project")
                .with_schema(project_id_schema("Project ID")),
        ),
        EndpointTool::new(
            client.clone(),
            UPDATE_PROJECT_PARTICIPANTS,
            ToolDefinition::new("updateProjectParticipants", "Replace the participants of a project")
                .with_schema(object_schema(
                    json!({
                        "projectId": integer("Project ID"),
                        "participants": {
                            "type": "array",
                            "description": "Array of participants",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "type": string_enum(&["USER", "TEAM"], "Participant type"),
                                    "id": integer("User or Team ID"),
                                    "role": string_enum(&["ADMIN", "CONTRIBUTOR", "REVIEWER"], "Participant role")
                                },
                                "required": ["type", "id", "role"]
                            }
                        }
                    }),
                    &["projectId", "participants"],
                )),
        )
        .with_body(participants_body)
        .with_render(Render::Updated("participants")),
        EndpointTool::new(
            client.clone(),
            LIST_PROJECT_SOURCE_DOCUMENTS,
            ToolDefinition::new("listProjectSourceDocuments", "List the source documents of a project")
                .with_schema(project_id_schema("Project ID")),
        ),
        // Custom project fields
        EndpointTool::new(
            client.clone(),
            GET_PROJECT_CUSTOM_FIELD_VALUES,
            ToolDefinition::new(
                "getCustomProjectFieldValuesForProject",
                "Get the custom field values of a project",
            )
            .with_schema(project_id_schema("Project ID")),
        ),
        EndpointTool::new(
            client.clone(),
            SET_PROJECT_CUSTOM_FIELD_VALUES,
            ToolDefinition::new(
                "setCustomProjectFieldValuesForProject",
                "Set the custom field values of a project",
            )
            .with_schema(object_schema(
                json!({
                    "projectId": integer("Project ID"),
                    "values": {
                        "type": "object",
                        "additionalProperties": { "type": "string" },
                        "description": "Custom field values (key-value pairs)"
                    }
                }),
                &["projectId", "values"],
            )),
        )
        .with_body(custom_field_values_body)
        .with_render(Render::Updated("custom field values")),
        EndpointTool::new(
            client.clone(),
            LIST_CUSTOM_PROJECT_FIELDS,
            ToolDefinition::new("listCustomProjectFields", "List custom project field definitions")
                .with_schema(object_schema(
                    json!({ "source": string("Filter by source (project, salesforce, msDynamics)") }),
                    &[],
                )),
        ),
        EndpointTool::new(
            client.clone(),
            GET_CUSTOM_PROJECT_FIELD,
            ToolDefinition::new("getCustomProjectField", "Get a custom project field definition")
                .with_schema(object_schema(json!({ "id": integer("Custom Project Field ID") }), &["id"])),
        ),
        EndpointTool::new(
            client.clone(),
            CREATE_CUSTOM_PROJECT_FIELD,
            ToolDefinition::new("createCustomProjectField", "Create a custom project field").with_schema(
                object_schema(
                    json!({
                        "name": { "type": "string", "maxLength": 40, "description": "Field name" },
                        "instructions": { "type": "string", "maxLength": 40, "description": "Instructions for filling out the field" },
                        "isRequired": boolean("Whether field is required"),
                        "fieldType": string_enum(&["SHORT_TEXT", "DROPDOWN"], "Field type"),
                        "dropdownValues": string_array("Dropdown values (required if fieldType is DROPDOWN)")
                    }),
                    &["name"],
                ),
            ),
        )
        .with_body(create_custom_field_body)
        .with_render(Render::Created("custom project field")),
        EndpointTool::new(
            client.clone(),
            UPDATE_CUSTOM_PROJECT_FIELD,
            ToolDefinition::new(
                "updateCustomProjectField",
                "Update a custom project field with JSON Patch operations",
            )
            .with_schema(object_schema(
                json!({
                    "id": integer("Custom Project Field ID"),
                    "operations": patch_operations()
                }),
                &["id", "operations"],
            )),
        )
        .with_body(patch_body)
        .with_render(Render::Updated("custom project field")),
        EndpointTool::new(
            client.clone(),
            DELETE_CUSTOM_PROJECT_FIELD,
            ToolDefinition::new("deleteCustomProjectField", "Delete a custom project field")
                .with_schema(object_schema(
                    json!({ "id": integer("Custom Project Field ID to delete") }),
                    &["id"],
                )),
        )
        .with_render(Render::Deleted("custom project field", "id")),
        // Templates
        EndpointTool::new(
            client.clone(),
            LIST_PROJECT_TEMPLATES,
            ToolDefinition::new("listProjectTemplates", "List project templates").with_schema(object_schema(
                json!({
                    "page": integer("Page number"),
                    "pageSize": integer("Items per page")
                }),
                &[],
            )),
        ),
        EndpointTool::new(
            client,
            CREATE_PROJECT_FROM_TEMPLATE,
            ToolDefinition::new(
                "createProjectFromTemplate",
                "Create a project from a template as an asynchronous task",
            )
            .with_schema(object_schema(
                from_template,
                &["projectTemplateId", "name", "projectType", "companyName", "dueDate"],
            )),
        )
        .with_body(project_from_template_body)
        .with_render(Render::ProjectTask),
    ]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectFilterParams {
    #[serde(default)]
    rfx_types: Option<Vec<ProjectType>>,
    #[serde(default)]
    owners: Option<Vec<i64>>,
}

fn check_project_filter(args: &Value) -> McpServerResult<()> {
    let params: ProjectFilterParams = parse_args(args)?;
    if params.owners.iter().flatten().any(|owner| *owner <= 0) {
        return Err(McpServerError::InvalidParams(
            "owners: ids must be positive".to_string(),
        ));
    }
    debug!(
        rfx_types = params.rfx_types.map(|t| t.len()).unwrap_or(0),
        "Listing projects"
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewProjectParams {
    name: String,
    project_type: ProjectType,
    company_name: String,
    due_date: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    owner_id: Option<i64>,
    #[serde(default)]
    custom_project_field_values: Option<BTreeMap<String, Option<String>>>,
    #[serde(default)]
    merge_variable_values: Option<BTreeMap<String, Option<String>>>,
}

impl From<NewProjectParams> for CreateProjectRequest {
    fn from(params: NewProjectParams) -> Self {
        Self {
            name: params.name,
            project_type: params.project_type,
            company_name: params.company_name,
            due_date: params.due_date,
            description: params.description.filter(|d| !d.is_empty()),
            owner: params.owner_id.map(IdRef::new),
            custom_project_field_values: params.custom_project_field_values,
            merge_variable_values: params.merge_variable_values,
        }
    }
}

fn create_project_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: NewProjectParams = parse_args(args)?;
    body_of(&CreateProjectRequest::from(params))
}

/// Template instantiation takes the project basics only.
fn project_from_template_body(args: &Value) -> McpServerResult<Option<Value>> {
    let mut params: NewProjectParams = parse_args(args)?;
    params.custom_project_field_values = None;
    params.merge_variable_values = None;
    body_of(&CreateProjectRequest::from(params))
}

fn update_project_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: UpdateProjectRequest = parse_args(args)?;
    body_of(&params)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComplianceSetParams {
    label: String,
    short_name: String,
    options: Vec<ComplianceOption>,
}

fn compliance_set_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: ComplianceSetParams = parse_args(args)?;
    body_of(&ComplianceSetRequest {
        label: params.label,
        short_name: params.short_name,
        options: params.options,
    })
}

#[derive(Debug, Deserialize)]
struct ParticipantsParams {
    participants: Vec<ParticipantReference>,
}

fn participants_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: ParticipantsParams = parse_args(args)?;
    body_of(&params.participants)
}

#[derive(Debug, Deserialize)]
struct CustomFieldValuesParams {
    values: BTreeMap<String, String>,
}

/// Free-form field values keyed by field name.
#[derive(Debug, Serialize)]
#[serde(transparent)]
struct CustomFieldValues(BTreeMap<String, String>);

impl Validate for CustomFieldValues {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.0.keys().find(|key| key.trim().is_empty()) {
            Some(_) => Err(ValidationError {
                field: "values".to_string(),
                message: "field keys must not be empty".to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn custom_field_values_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: CustomFieldValuesParams = parse_args(args)?;
    body_of(&CustomFieldValues(params.values))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomFieldParams {
    name: String,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    is_required: Option<bool>,
    #[serde(default)]
    field_type: Option<CustomProjectFieldType>,
    #[serde(default)]
    dropdown_values: Option<Vec<String>>,
}

fn create_custom_field_body(args: &Value) -> McpServerResult<Option<Value>> {
    let params: CustomFieldParams = parse_args(args)?;
    body_of(&CreateCustomProjectFieldRequest {
        name: params.name,
        instructions: params.instructions,
        is_required: params.is_required,
        field_type: params.field_type,
        dropdown_values: params.dropdown_values,
    })
}
