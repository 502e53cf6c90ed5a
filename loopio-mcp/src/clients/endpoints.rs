//! Declarative Loopio endpoint table.
//!
//! Each endpoint is a `const` describing its method, path template and query
//! parameters. [`Endpoint::request`] turns tool arguments into an
//! [`ApiRequest`], so one generic executor serves every operation.

use super::executor::{ApiRequest, ClientError, ContentType, HttpMethod};
use serde_json::{Map, Value};

/// How a tool argument is rendered into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// String argument emitted once.
    Text,
    /// Integer argument emitted once.
    Integer,
    /// Array argument emitted once per element under the same key.
    Repeated,
    /// Any argument serialized as compact JSON.
    Json,
    /// Boolean argument; when true, emits the fixed value.
    FlagValue(&'static str),
}

/// One query parameter of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParam {
    /// Tool argument name.
    pub arg: &'static str,
    /// Query key on the wire.
    pub key: &'static str,
    /// Rendering rule.
    pub kind: QueryKind,
    /// Whether the argument must be present and non-null.
    pub required: bool,
}

impl QueryParam {
    const fn named(arg: &'static str, key: &'static str, kind: QueryKind) -> Self {
        Self {
            arg,
            key,
            kind,
            required: false,
        }
    }

    /// String parameter whose key matches the argument name.
    pub const fn text(name: &'static str) -> Self {
        Self::named(name, name, QueryKind::Text)
    }

    /// Integer parameter whose key matches the argument name.
    pub const fn integer(name: &'static str) -> Self {
        Self::named(name, name, QueryKind::Integer)
    }

    /// Array parameter repeated under `key`.
    pub const fn repeated(arg: &'static str, key: &'static str) -> Self {
        Self::named(arg, key, QueryKind::Repeated)
    }

    /// JSON-encoded parameter.
    pub const fn json(name: &'static str) -> Self {
        Self::named(name, name, QueryKind::Json)
    }

    /// Boolean argument mapped to a fixed `key=value` pair.
    pub const fn flag(arg: &'static str, key: &'static str, value: &'static str) -> Self {
        Self::named(arg, key, QueryKind::FlagValue(value))
    }

    /// Reject requests that omit this argument.
    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }
}

/// A Loopio REST operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template; `{name}` placeholders are filled from tool arguments.
    pub path: &'static str,
    /// Query parameters in emission order.
    pub query: &'static [QueryParam],
    /// Body content type.
    pub content_type: ContentType,
}

impl Endpoint {
    /// Endpoint with no query parameters and a JSON body.
    pub const fn new(method: HttpMethod, path: &'static str) -> Self {
        Self {
            method,
            path,
            query: &[],
            content_type: ContentType::Json,
        }
    }

    pub const fn get(path: &'static str) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub const fn post(path: &'static str) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub const fn put(path: &'static str) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub const fn patch(path: &'static str) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub const fn delete(path: &'static str) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Set the query parameters.
    pub const fn with_query(self, query: &'static [QueryParam]) -> Self {
        Self { query, ..self }
    }

    /// Send the body as `application/json-patch+json`.
    pub const fn json_patch(self) -> Self {
        Self {
            content_type: ContentType::JsonPatch,
            ..self
        }
    }

    /// Placeholder names in the path template, in order.
    pub fn path_params(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    names.push(&after[..end]);
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        names
    }

    /// Build the request for the given tool arguments and optional body.
    pub fn request(&self, args: &Value, body: Option<Value>) -> Result<ApiRequest, ClientError> {
        let empty = Map::new();
        let args = args.as_object().unwrap_or(&empty);

        let mut request = ApiRequest::new(self.method, self.render_path(args)?);
        request.content_type = self.content_type;
        request.query = self.render_query(args)?;
        request.body = body;
        Ok(request)
    }

    fn render_path(&self, args: &Map<String, Value>) -> Result<String, ClientError> {
        let mut out = String::with_capacity(self.path.len());
        let mut rest = self.path;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| {
                ClientError::InvalidParams(format!("malformed path template: {}", self.path))
            })?;
            let name = &after[..end];
            let segment = args.get(name).and_then(path_segment).ok_or_else(|| {
                ClientError::InvalidParams(format!(
                    "missing or invalid required parameter '{}'",
                    name
                ))
            })?;
            out.push_str(&segment);
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn render_query(&self, args: &Map<String, Value>) -> Result<Vec<(String, String)>, ClientError> {
        let mut pairs = Vec::new();

        for param in self.query {
            let value = match args.get(param.arg) {
                None | Some(Value::Null) if param.required => {
                    return Err(ClientError::InvalidParams(format!(
                        "missing required parameter '{}'",
                        param.arg
                    )));
                }
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            match param.kind {
                QueryKind::Text => {
                    let text = value
                        .as_str()
                        .ok_or_else(|| invalid_query(param, "a string"))?;
                    pairs.push((param.key.to_string(), text.to_string()));
                }
                QueryKind::Integer => {
                    let rendered = integer(value).ok_or_else(|| invalid_query(param, "an integer"))?;
                    pairs.push((param.key.to_string(), rendered));
                }
                QueryKind::Repeated => {
                    let items = value
                        .as_array()
                        .ok_or_else(|| invalid_query(param, "an array"))?;
                    for item in items {
                        let rendered =
                            scalar(item).ok_or_else(|| invalid_query(param, "an array of scalars"))?;
                        pairs.push((param.key.to_string(), rendered));
                    }
                }
                QueryKind::Json => {
                    pairs.push((param.key.to_string(), value.to_string()));
                }
                QueryKind::FlagValue(fixed) => {
                    let enabled = value
                        .as_bool()
                        .ok_or_else(|| invalid_query(param, "a boolean"))?;
                    if enabled {
                        pairs.push((param.key.to_string(), fixed.to_string()));
                    }
                }
            }
        }

        Ok(pairs)
    }
}

fn invalid_query(param: &QueryParam, expected: &str) -> ClientError {
    ClientError::InvalidParams(format!("parameter '{}' must be {}", param.arg, expected))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn integer(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(|v| v.to_string())
            .or_else(|| n.as_u64().map(|v| v.to_string())),
        _ => None,
    }
}

fn path_segment(value: &Value) -> Option<String> {
    match value {
        Value::Number(_) => integer(value),
        Value::String(s)
            if !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            Some(s.clone())
        }
        _ => None,
    }
}

const PAGING: [QueryParam; 2] = [QueryParam::integer("page"), QueryParam::integer("pageSize")];

// Customers
pub const GET_CUSTOMER: Endpoint = Endpoint::get("/customers/{customerId}");
pub const GET_CUSTOMER_ACTIVE_LANGUAGES: Endpoint =
    Endpoint::get("/customers/{customerId}/activeLanguages");

// Library entries
pub const LIST_LIBRARY_ENTRIES: Endpoint = Endpoint::get("/libraryEntries").with_query(&[
    PAGING[0],
    PAGING[1],
    QueryParam::json("filter"),
]);
pub const GET_LIBRARY_ENTRY: Endpoint = Endpoint::get("/libraryEntries/{libraryEntryId}")
    .with_query(&[QueryParam::flag("inlineMergeVariables", "inline[]", "@mergeVariables")]);
pub const CREATE_LIBRARY_ENTRY: Endpoint = Endpoint::post("/libraryEntries");
pub const UPDATE_LIBRARY_ENTRY: Endpoint =
    Endpoint::patch("/libraryEntries/{libraryEntryId}").json_patch();
pub const DELETE_LIBRARY_ENTRY: Endpoint = Endpoint::delete("/libraryEntries/{libraryEntryId}");
pub const GET_LIBRARY_ENTRY_ATTACHMENTS: Endpoint =
    Endpoint::get("/libraryEntries/{libraryEntryId}/attachments");
pub const LIST_LIBRARY_ENTRY_HISTORIES: Endpoint =
    Endpoint::get("/libraryEntryHistories/{libraryEntryId}").with_query(&PAGING);
pub const GET_LIBRARY_ENTRY_HISTORY: Endpoint =
    Endpoint::get("/libraryEntryHistories/{libraryEntryId}/{historyId}");
pub const BULK_CREATE_LIBRARY_ENTRIES: Endpoint = Endpoint::post("/libraryEntries/bulk");

// Stacks and files
pub const LIST_STACKS: Endpoint = Endpoint::get("/stacks").with_query(&[QueryParam::text("fields")]);
pub const SHOW_FILE: Endpoint = Endpoint::get("/files/{fileId}");
pub const DELETE_FILE: Endpoint = Endpoint::delete("/files/{fileId}");

// Projects
pub const LIST_PROJECTS: Endpoint = Endpoint::get("/projects").with_query(&[
    PAGING[0],
    PAGING[1],
    QueryParam::repeated("rfxTypes", "rfxTypes"),
    QueryParam::repeated("owners", "owners"),
]);
pub const GET_PROJECT: Endpoint =
    Endpoint::get("/projects/{projectId}").with_query(&[QueryParam::text("fields")]);
pub const CREATE_PROJECT: Endpoint = Endpoint::post("/projects");
pub const UPDATE_PROJECT: Endpoint = Endpoint::patch("/projects/{projectId}");
pub const DELETE_PROJECT: Endpoint = Endpoint::delete("/projects/{projectId}");
pub const GET_PROJECT_SUMMARY: Endpoint = Endpoint::get("/projects/{projectId}/summary");
pub const LIST_PROJECT_SUMMARIES: Endpoint =
    Endpoint::get("/projects/summary").with_query(&[QueryParam::text("lastUpdatedDateGt").required()]);

// Compliance sets
pub const LIST_COMPLIANCE_SETS: Endpoint = Endpoint::get("/projects/{projectId}/complianceSets");
pub const GET_COMPLIANCE_SET: Endpoint =
    Endpoint::get("/projects/{projectId}/complianceSets/{complianceSetId}");
pub const CREATE_COMPLIANCE_SET: Endpoint = Endpoint::post("/projects/{projectId}/complianceSets");
pub const UPDATE_COMPLIANCE_SET: Endpoint =
    Endpoint::put("/projects/{projectId}/complianceSets/{complianceSetId}");
pub const DELETE_COMPLIANCE_SET: Endpoint =
    Endpoint::delete("/projects/{projectId}/complianceSets/{complianceSetId}");

// Participants and source documents
pub const GET_PROJECT_PARTICIPANTS: Endpoint = Endpoint::get("/projects/{projectId}/participants");
pub const UPDATE_PROJECT_PARTICIPANTS: Endpoint =
    Endpoint::put("/projects/{projectId}/participants");
pub const LIST_PROJECT_SOURCE_DOCUMENTS: Endpoint =
    Endpoint::get("/projects/{projectId}/sourceDocuments");

// Custom project fields
pub const GET_PROJECT_CUSTOM_FIELD_VALUES: Endpoint =
    Endpoint::get("/projects/{projectId}/customProjectFields");
pub const SET_PROJECT_CUSTOM_FIELD_VALUES: Endpoint =
    Endpoint::put("/projects/{projectId}/customProjectFields");
pub const LIST_CUSTOM_PROJECT_FIELDS: Endpoint =
    Endpoint::get("/customProjectFields").with_query(&[QueryParam::text("source")]);
pub const GET_CUSTOM_PROJECT_FIELD: Endpoint = Endpoint::get("/customProjectFields/{id}");
pub const CREATE_CUSTOM_PROJECT_FIELD: Endpoint = Endpoint::post("/customProjectFields");
pub const UPDATE_CUSTOM_PROJECT_FIELD: Endpoint =
    Endpoint::patch("/customProjectFields/{id}").json_patch();
pub const DELETE_CUSTOM_PROJECT_FIELD: Endpoint = Endpoint::delete("/customProjectFields/{id}");

// Project templates
pub const LIST_PROJECT_TEMPLATES: Endpoint = Endpoint::get("/projectTemplates").with_query(&PAGING);
pub const CREATE_PROJECT_FROM_TEMPLATE: Endpoint =
    Endpoint::post("/projectTemplates/{projectTemplateId}/projects");

// Project entries
pub const LIST_PROJECT_ENTRIES: Endpoint = Endpoint::get("/projectEntries").with_query(&[
    QueryParam::integer("projectId").required(),
    QueryParam::integer("sectionId"),
    QueryParam::integer("subSectionId"),
    QueryParam::repeated("inline", "inline[]"),
    PAGING[0],
    PAGING[1],
]);
pub const GET_PROJECT_ENTRY: Endpoint = Endpoint::get("/projectEntries/{projectEntryId}")
    .with_query(&[QueryParam::repeated("inline", "inline[]")]);
pub const CREATE_PROJECT_ENTRY: Endpoint = Endpoint::post("/projectEntries");
pub const UPDATE_PROJECT_ENTRY: Endpoint = Endpoint::patch("/projectEntries/{projectEntryId}");
pub const DELETE_PROJECT_ENTRY: Endpoint = Endpoint::delete("/projectEntries/{projectEntryId}");

// Sections
pub const LIST_SECTIONS: Endpoint = Endpoint::get("/sections").with_query(&[
    QueryParam::integer("projectId").required(),
    PAGING[0],
    PAGING[1],
]);
pub const GET_SECTION: Endpoint = Endpoint::get("/sections/{sectionId}");
pub const CREATE_SECTION: Endpoint = Endpoint::post("/sections");
pub const UPDATE_SECTION: Endpoint = Endpoint::patch("/sections/{sectionId}");
pub const DELETE_SECTION: Endpoint = Endpoint::delete("/sections/{sectionId}");

// Subsections
pub const LIST_SUB_SECTIONS: Endpoint = Endpoint::get("/subSections").with_query(&[
    QueryParam::integer("projectId").required(),
    QueryParam::integer("sectionId"),
    PAGING[0],
    PAGING[1],
]);
pub const GET_SUB_SECTION: Endpoint = Endpoint::get("/subSections/{subSectionId}");
pub const CREATE_SUB_SECTION: Endpoint = Endpoint::post("/subSections");
pub const UPDATE_SUB_SECTION: Endpoint = Endpoint::patch("/subSections/{subSectionId}");
pub const DELETE_SUB_SECTION: Endpoint = Endpoint::delete("/subSections/{subSectionId}");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paging_query_order() {
        let request = LIST_PROJECTS
            .request(&json!({"page": 2, "pageSize": 50}), None)
            .unwrap();
        assert_eq!(request.path, "/projects");
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("pageSize".to_string(), "50".to_string())
            ]
        );
    }

    #[test]
    fn test_repeated_query_values() {
        let request = LIST_PROJECTS
            .request(&json!({"rfxTypes": ["RFP", "DDQ"], "owners": [3]}), None)
            .unwrap();
        assert_eq!(
            request.query,
            vec![
                ("rfxTypes".to_string(), "RFP".to_string()),
                ("rfxTypes".to_string(), "DDQ".to_string()),
                ("owners".to_string(), "3".to_string())
            ]
        );
    }

    #[test]
    fn test_filter_is_json_encoded() {
        let request = LIST_LIBRARY_ENTRIES
            .request(&json!({"filter": {"searchQuery": "security"}}), None)
            .unwrap();
        assert_eq!(
            request.query,
            vec![("filter".to_string(), "{\"searchQuery\":\"security\"}".to_string())]
        );
    }

    #[test]
    fn test_flag_query() {
        let on = GET_LIBRARY_ENTRY
            .request(&json!({"libraryEntryId": 5, "inlineMergeVariables": true}), None)
            .unwrap();
        assert_eq!(on.path, "/libraryEntries/5");
        assert_eq!(
            on.query,
            vec![("inline[]".to_string(), "@mergeVariables".to_string())]
        );

        let off = GET_LIBRARY_ENTRY
            .request(&json!({"libraryEntryId": 5, "inlineMergeVariables": false}), None)
            .unwrap();
        assert!(off.query.is_empty());
    }

    #[test]
    fn test_nested_path_params() {
        let request = DELETE_COMPLIANCE_SET
            .request(&json!({"projectId": 11, "complianceSetId": 22}), None)
            .unwrap();
        assert_eq!(request.method, HttpMethod::Delete);
        assert_eq!(request.path, "/projects/11/complianceSets/22");
        assert_eq!(
            DELETE_COMPLIANCE_SET.path_params(),
            vec!["projectId", "complianceSetId"]
        );
    }

    #[test]
    fn test_missing_path_param() {
        let err = GET_PROJECT.request(&json!({}), None).unwrap_err();
        assert!(err.to_string().contains("projectId"));
    }

    #[test]
    fn test_path_param_rejects_traversal() {
        assert!(SHOW_FILE.request(&json!({"fileId": "../admin"}), None).is_err());
        assert!(SHOW_FILE.request(&json!({"fileId": 1.5}), None).is_err());
    }

    #[test]
    fn test_null_and_absent_query_args_skipped() {
        let request = LIST_SUB_SECTIONS
            .request(&json!({"projectId": 1, "sectionId": null}), None)
            .unwrap();
        assert_eq!(request.query, vec![("projectId".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_json_patch_endpoint_content_type() {
        let request = UPDATE_CUSTOM_PROJECT_FIELD
            .request(&json!({"id": 3}), Some(json!([])))
            .unwrap();
        assert_eq!(request.content_type, ContentType::JsonPatch);
        assert_eq!(UPDATE_PROJECT.content_type, ContentType::Json);
    }

    #[test]
    fn test_required_query_param() {
        let err = LIST_SECTIONS.request(&json!({}), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameters: missing required parameter 'projectId'"
        );
        assert!(LIST_PROJECT_SUMMARIES
            .request(&json!({"lastUpdatedDateGt": null}), None)
            .is_err());

        let request = LIST_PROJECT_SUMMARIES
            .request(&json!({"lastUpdatedDateGt": "2024-01-01T00:00:00Z"}), None)
            .unwrap();
        assert_eq!(
            request.query,
            vec![("lastUpdatedDateGt".to_string(), "2024-01-01T00:00:00Z".to_string())]
        );
    }

    #[test]
    fn test_integer_query_rejects_non_integers() {
        for page in [json!("abc"), json!("2"), json!(1.5), json!(true)] {
            let err = LIST_PROJECT_ENTRIES
                .request(&json!({"projectId": 1, "page": page}), None)
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid parameters: parameter 'page' must be an integer"
            );
        }
    }

    #[test]
    fn test_text_query_rejects_numbers() {
        let err = GET_PROJECT
            .request(&json!({"projectId": 1, "fields": 7}), None)
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidParams(_)));
    }

    #[test]
    fn test_wrong_query_type() {
        let err = LIST_PROJECTS.request(&json!({"owners": 3}), None).unwrap_err();
        assert!(matches!(err, ClientError::InvalidParams(_)));
    }
}
