//! Loopio API request and response models
//!
//! Request bodies are explicit structures validated before serialization.
//! Responses the tools only relay are kept as raw JSON; the types at the end of
//! this module cover the shapes the adapter itself reads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A request body failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Offending field path.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Request bodies that can be checked before they are sent.
pub trait Validate {
    /// Check required fields and value constraints.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// `{ "id": n }` reference used inside request bodies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdRef {
    pub id: i64,
}

impl IdRef {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}

/// `{ "text": ... }` wrapper for questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionText {
    pub text: String,
}

/// Answer body; `text` may be null when compliance answers carry the response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerText {
    pub text: Option<String>,
}

// =============================================================================
// Library
// =============================================================================

/// Where a library entry lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryLocation {
    pub stack: IdRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<IdRef>,
}

/// Body of `POST /libraryEntries` (also one element of a bulk create).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateLibraryEntryRequest {
    pub questions: Vec<QuestionText>,
    pub answer: AnswerText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    pub location: EntryLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Validate for CreateLibraryEntryRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.questions.is_empty() {
            return Err(ValidationError::new("questions", "at least one question is required"));
        }
        if let Some(index) = self.questions.iter().position(|q| q.text.trim().is_empty()) {
            return Err(ValidationError::new(
                format!("questions[{}].text", index),
                "must not be empty",
            ));
        }
        Ok(())
    }
}

/// Date range used by library search filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateTimeRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

/// Library location filter (note the upper-case `ID` suffixes on the wire).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryLocation {
    #[serde(rename = "stackID")]
    pub stack_id: i64,
    #[serde(rename = "categoryID", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(rename = "subCategoryID", skip_serializing_if = "Option::is_none")]
    pub sub_category_id: Option<i64>,
}

/// JSON-encoded `filter` query parameter of `GET /libraryEntries`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_date: Option<DateTimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<LibraryLocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_phrase: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_attachment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_in_questions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_in_answers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_in_tags: Option<bool>,
}

// =============================================================================
// JSON Patch
// =============================================================================

/// JSON Patch operation kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

/// One JSON Patch operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonPatchOperation {
    pub op: PatchOp,
    pub path: String,
    /// Explicit `null` is kept as `Some(Value::Null)`; only an absent key is `None`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl JsonPatchOperation {
    /// `replace` operation.
    pub fn replace(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value),
            from: None,
        }
    }
}

impl Validate for JsonPatchOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.path.starts_with('/') {
            return Err(ValidationError::new("path", "must be a JSON pointer starting with '/'"));
        }
        match self.op {
            PatchOp::Add | PatchOp::Replace | PatchOp::Test if self.value.is_none() => Err(
                ValidationError::new("value", format!("required for '{:?}'", self.op).to_lowercase()),
            ),
            PatchOp::Move | PatchOp::Copy if self.from.is_none() => Err(ValidationError::new(
                "from",
                format!("required for '{:?}'", self.op).to_lowercase(),
            )),
            _ => Ok(()),
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        for (index, item) in self.iter().enumerate() {
            item.validate().map_err(|e| ValidationError {
                field: format!("[{}].{}", index, e.field),
                message: e.message,
            })?;
        }
        Ok(())
    }
}

// =============================================================================
// Projects
// =============================================================================

/// Project type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectType {
    Rfp,
    Rfi,
    Ddq,
    Sq,
    Pp,
    Other,
}

impl ProjectType {
    /// Wire names, in schema order.
    pub const ALL: [&'static str; 6] = ["RFP", "RFI", "DDQ", "SQ", "PP", "OTHER"];
}

/// Body of `POST /projects` and of project-from-template creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub project_type: ProjectType,
    pub company_name: String,
    pub due_date: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_project_field_values: Option<BTreeMap<String, Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_variable_values: Option<BTreeMap<String, Option<String>>>,
}

impl Validate for CreateProjectRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        if self.company_name.trim().is_empty() {
            return Err(ValidationError::new("companyName", "must not be empty"));
        }
        if self.due_date.trim().is_empty() {
            return Err(ValidationError::new("dueDate", "must not be empty"));
        }
        Ok(())
    }
}

/// Body of `PATCH /projects/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateProjectRequest {
    pub status: String,
}

impl Validate for UpdateProjectRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.status.trim().is_empty() {
            return Err(ValidationError::new("status", "must not be empty"));
        }
        Ok(())
    }
}

/// One option of a compliance set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceOption {
    pub label: String,
}

/// Body for creating or replacing a project compliance set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSetRequest {
    pub label: String,
    pub short_name: String,
    pub options: Vec<ComplianceOption>,
}

impl Validate for ComplianceSetRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.label.trim().is_empty() {
            return Err(ValidationError::new("label", "must not be empty"));
        }
        if self.short_name.is_empty() {
            return Err(ValidationError::new("shortName", "must be at least 1 character"));
        }
        Ok(())
    }
}

/// Participant kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParticipantType {
    User,
    Team,
}

/// Participant role on a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParticipantRole {
    Admin,
    Contributor,
    Reviewer,
}

/// Project participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantReference {
    #[serde(rename = "type")]
    pub kind: ParticipantType,
    pub id: i64,
    pub role: ParticipantRole,
}

impl Validate for ParticipantReference {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// =============================================================================
// Custom project fields
// =============================================================================

/// Custom project field type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomProjectFieldType {
    ShortText,
    Dropdown,
}

/// Maximum length of a custom field name or its instructions.
pub const CUSTOM_FIELD_TEXT_MAX: usize = 40;

/// Body of `POST /customProjectFields`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomProjectFieldRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<CustomProjectFieldType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropdown_values: Option<Vec<String>>,
}

impl Validate for CreateCustomProjectFieldRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        if self.name.chars().count() > CUSTOM_FIELD_TEXT_MAX {
            return Err(ValidationError::new(
                "name",
                format!("must be at most {} characters", CUSTOM_FIELD_TEXT_MAX),
            ));
        }
        if let Some(ref instructions) = self.instructions {
            if instructions.chars().count() > CUSTOM_FIELD_TEXT_MAX {
                return Err(ValidationError::new(
                    "instructions",
                    format!("must be at most {} characters", CUSTOM_FIELD_TEXT_MAX),
                ));
            }
        }
        let has_values = self
            .dropdown_values
            .as_ref()
            .map(|values| !values.is_empty())
            .unwrap_or(false);
        if self.field_type == Some(CustomProjectFieldType::Dropdown) && !has_values {
            return Err(ValidationError::new(
                "dropdownValues",
                "required when fieldType is DROPDOWN",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Project entries, sections, subsections
// =============================================================================

/// Body of `POST /projectEntries`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectEntryRequest {
    pub project_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_section_id: Option<i64>,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerText>,
}

impl Validate for CreateProjectEntryRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.section_id.is_none() && self.sub_section_id.is_none() {
            return Err(ValidationError::new(
                "sectionId",
                "provide either sectionId or subSectionId",
            ));
        }
        if self.question.trim().is_empty() {
            return Err(ValidationError::new("question", "must not be empty"));
        }
        Ok(())
    }
}

/// Body of `PATCH /projectEntries/{id}`; only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateProjectEntryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerText>,
}

impl Validate for UpdateProjectEntryRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.question.is_none() && self.answer.is_none() {
            return Err(ValidationError::new("question", "nothing to update"));
        }
        Ok(())
    }
}

/// Body of `POST /sections`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionRequest {
    pub project_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl Validate for CreateSectionRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        Ok(())
    }
}

/// Body of `POST /subSections`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubSectionRequest {
    pub project_id: i64,
    pub section_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl Validate for CreateSubSectionRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        Ok(())
    }
}

/// Body of `PATCH /sections/{id}` and `PATCH /subSections/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateSectionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl Validate for UpdateSectionRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_none() && self.position.is_none() {
            return Err(ValidationError::new("name", "nothing to update"));
        }
        Ok(())
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Pagination block of list responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// Paginated list response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Any resource carrying a numeric id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identified {
    pub id: i64,
}

/// Accepted asynchronous task (bulk library entry creation).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskAccepted {
    pub task_id: serde_json::Value,
}

/// Accepted project-from-template task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTaskAccepted {
    pub task_id: serde_json::Value,
    #[serde(default)]
    pub project_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> CreateLibraryEntryRequest {
        CreateLibraryEntryRequest {
            questions: vec![QuestionText {
                text: "Do you encrypt data at rest?".to_string(),
            }],
            answer: AnswerText {
                text: Some("Yes, AES-256.".to_string()),
            },
            language_code: None,
            location: EntryLocation {
                stack: IdRef::new(7),
                category: None,
                sub_category: Some(IdRef::new(9)),
            },
            tags: None,
        }
    }

    #[test]
    fn test_library_entry_wire_shape() {
        let value = serde_json::to_value(entry()).unwrap();
        assert_eq!(
            value,
            json!({
                "questions": [{"text": "Do you encrypt data at rest?"}],
                "answer": {"text": "Yes, AES-256."},
                "location": {"stack": {"id": 7}, "subCategory": {"id": 9}}
            })
        );
    }

    #[test]
    fn test_library_entry_requires_question() {
        let mut request = entry();
        request.questions.clear();
        assert_eq!(request.validate().unwrap_err().field, "questions");
    }

    #[test]
    fn test_search_filter_location_ids() {
        let filter = LibrarySearchFilter {
            locations: Some(vec![LibraryLocation {
                stack_id: 1,
                category_id: Some(2),
                sub_category_id: None,
            }]),
            search_query: Some("soc2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(filter).unwrap(),
            json!({"locations": [{"stackID": 1, "categoryID": 2}], "searchQuery": "soc2"})
        );
    }

    #[test]
    fn test_patch_operation_rules() {
        let replace = JsonPatchOperation::replace("/answer/text", json!("new text"));
        assert!(replace.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&replace).unwrap(),
            json!({"op": "replace", "path": "/answer/text", "value": "new text"})
        );

        let missing_from: JsonPatchOperation =
            serde_json::from_value(json!({"op": "move", "path": "/tags/1"})).unwrap();
        assert_eq!(missing_from.validate().unwrap_err().field, "from");

        let missing_value: JsonPatchOperation =
            serde_json::from_value(json!({"op": "add", "path": "/tags/-"})).unwrap();
        assert_eq!(missing_value.validate().unwrap_err().field, "value");

        let remove: JsonPatchOperation =
            serde_json::from_value(json!({"op": "remove", "path": "/tags/0"})).unwrap();
        assert!(remove.validate().is_ok());

        let clear: JsonPatchOperation =
            serde_json::from_value(json!({"op": "replace", "path": "/answer/text", "value": null}))
                .unwrap();
        assert!(clear.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&clear).unwrap(),
            json!({"op": "replace", "path": "/answer/text", "value": null})
        );
    }

    #[test]
    fn test_patch_list_reports_index() {
        let ops = vec![
            JsonPatchOperation::replace("/name", json!("x")),
            JsonPatchOperation {
                op: PatchOp::Copy,
                path: "/a".to_string(),
                value: None,
                from: None,
            },
        ];
        assert_eq!(ops.validate().unwrap_err().field, "[1].from");
    }

    #[test]
    fn test_unknown_patch_op_rejected() {
        let parsed: Result<JsonPatchOperation, _> =
            serde_json::from_value(json!({"op": "merge", "path": "/a"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_project_type_wire_names() {
        for name in ProjectType::ALL {
            let parsed: ProjectType = serde_json::from_value(json!(name)).unwrap();
            assert_eq!(serde_json::to_value(parsed).unwrap(), json!(name));
        }
    }

    #[test]
    fn test_dropdown_field_requires_values() {
        let request = CreateCustomProjectFieldRequest {
            name: "Region".to_string(),
            instructions: None,
            is_required: None,
            field_type: Some(CustomProjectFieldType::Dropdown),
            dropdown_values: None,
        };
        assert_eq!(request.validate().unwrap_err().field, "dropdownValues");
        assert_eq!(
            serde_json::to_value(CustomProjectFieldType::ShortText).unwrap(),
            json!("SHORT_TEXT")
        );
    }

    #[test]
    fn test_custom_field_name_length() {
        let request = CreateCustomProjectFieldRequest {
            name: "x".repeat(41),
            instructions: None,
            is_required: None,
            field_type: None,
            dropdown_values: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_project_entry_needs_a_section() {
        let request = CreateProjectEntryRequest {
            project_id: 1,
            section_id: None,
            sub_section_id: None,
            question: "Q".to_string(),
            answer: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_participant_wire_shape() {
        let participant: ParticipantReference =
            serde_json::from_value(json!({"type": "TEAM", "id": 4, "role": "REVIEWER"})).unwrap();
        assert_eq!(participant.kind, ParticipantType::Team);
        assert_eq!(participant.role, ParticipantRole::Reviewer);
    }

    #[test]
    fn test_page_parses() {
        let page: Page<Identified> = serde_json::from_value(json!({
            "data": [{"id": 1}, {"id": 2}],
            "meta": {"page": 2, "pageSize": 50, "total": 52}
        }))
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta.page_size, 50);
    }
}
