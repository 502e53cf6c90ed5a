//! End-to-end tests for the MCP server against a mock Loopio API.
//!
//! Requests go through `McpServer::handle_request` (and, in the last test,
//! the stdio line transport) with every tool registered, so each test
//! exercises argument validation, endpoint mapping, the HTTP call and the
//! rendered tool result together.

use loopio_auth::StaticToken;
use loopio_mcp::app::build_server;
use loopio_mcp::transport::serve;
use loopio_mcp::{LoopioConfig, McpError, McpRequest, McpServer, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test fixture: a mock Loopio API and a server wired to it.
struct TestFixture {
    api: MockServer,
    server: McpServer,
}

impl TestFixture {
    async fn new() -> Self {
        let api = MockServer::start().await;
        let config = LoopioConfig::new("test-client", "test-secret").with_base_url(api.uri());
        let server = build_server(&config, Arc::new(StaticToken::new("test-token")))
            .await
            .expect("server builds");
        Self { api, server }
    }

    /// Call a tool and decode the result.
    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        let request = McpRequest::new(1i64, "tools/call")
            .with_params(json!({ "name": name, "arguments": arguments }));
        let response = self.server.handle_request(request).await.expect("response");
        assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
        serde_json::from_value(response.result.expect("result")).expect("tool result")
    }

    /// Call a tool expecting a JSON-RPC error code.
    async fn call_err(&self, name: &str, arguments: Value) -> i32 {
        let request = McpRequest::new(2i64, "tools/call")
            .with_params(json!({ "name": name, "arguments": arguments }));
        let response = self.server.handle_request(request).await.expect("response");
        response.error.expect("error").code
    }
}

#[tokio::test]
async fn test_get_library_entry_returns_pretty_json() {
    let fixture = TestFixture::new().await;
    let entry = json!({"id": 42, "questions": [{"text": "Do you support SSO?"}]});

    Mock::given(method("GET"))
        .and(path("/libraryEntries/42"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry.clone()))
        .expect(1)
        .mount(&fixture.api)
        .await;

    let result = fixture.call("getLibraryEntry", json!({"libraryEntryId": 42})).await;

    assert!(!result.is_error);
    assert_eq!(
        result.text_content(),
        serde_json::to_string_pretty(&entry).unwrap()
    );
}

#[tokio::test]
async fn test_create_library_entry_sends_nested_body() {
    let fixture = TestFixture::new().await;
    let created = json!({"id": 77, "questions": [{"text": "Is data encrypted?"}]});

    Mock::given(method("POST"))
        .and(path("/libraryEntries"))
        .and(body_json(json!({
            "questions": [{"text": "Is data encrypted?"}],
            "answer": {"text": "Yes"},
            "location": {"stack": {"id": 3}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created.clone()))
        .expect(1)
        .mount(&fixture.api)
        .await;

    let result = fixture
        .call(
            "createLibraryEntry",
            json!({
                "questions": [{"text": "Is data encrypted?"}],
                "answerText": "Yes",
                "stackId": 3
            }),
        )
        .await;

    assert!(!result.is_error);
    assert_eq!(
        result.text_content(),
        format!(
            "Successfully created library entry with ID: 77\n\n{}",
            serde_json::to_string_pretty(&created).unwrap()
        )
    );
}

#[tokio::test]
async fn test_delete_library_entry_message() {
    let fixture = TestFixture::new().await;

    Mock::given(method("DELETE"))
        .and(path("/libraryEntries/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&fixture.api)
        .await;

    let result = fixture.call("deleteLibraryEntry", json!({"libraryEntryId": 42})).await;
    assert_eq!(result.text_content(), "Successfully deleted library entry 42");
}

#[tokio::test]
async fn test_list_projects_paging() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("page", "3"))
        .and(query_param("pageSize", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [], "totalItems": 0})))
        .expect(1)
        .mount(&fixture.api)
        .await;

    let result = fixture
        .call("listProjects", json!({"page": 3, "pageSize": 25}))
        .await;
    assert!(!result.is_error);
}

#[tokio::test]
async fn test_api_error_becomes_error_result() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/projects/5"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&fixture.api)
        .await;

    let result = fixture.call("getProject", json!({"projectId": 5})).await;

    assert!(result.is_error);
    let text = result.text_content();
    assert!(text.contains("403"), "{}", text);
    assert!(text.contains("forbidden"), "{}", text);
}

#[tokio::test]
async fn test_invalid_arguments_rejected_before_sending() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(0)
        .mount(&fixture.api)
        .await;

    let code = fixture
        .call_err(
            "createLibraryEntry",
            json!({"questions": [], "answerText": "x", "stackId": 3}),
        )
        .await;
    assert_eq!(code, McpError::INVALID_PARAMS);
}

#[tokio::test]
async fn test_bad_query_arguments_rejected_before_sending() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(0)
        .mount(&fixture.api)
        .await;

    let cases = [
        ("listProjectSections", json!({})),
        ("listProjectSubSections", json!({"sectionId": 2})),
        ("getProjectSummaryList", json!({})),
        ("listProjectEntries", json!({"projectId": 1, "page": "abc"})),
        ("listProjectEntries", json!({"projectId": "1"})),
        ("listProjects", json!({"pageSize": 2.5})),
    ];

    for (tool, arguments) in cases {
        let code = fixture.call_err(tool, arguments.clone()).await;
        assert_eq!(code, McpError::INVALID_PARAMS, "{} {}", tool, arguments);
    }
}

#[tokio::test]
async fn test_unknown_tool() {
    let fixture = TestFixture::new().await;
    let code = fixture.call_err("noSuchTool", json!({})).await;
    assert_eq!(code, McpError::INVALID_PARAMS);
}

#[tokio::test]
async fn test_read_library_entry_resource() {
    let fixture = TestFixture::new().await;
    let entry = json!({"id": 12, "answer": {"text": "Yes"}});

    Mock::given(method("GET"))
        .and(path("/libraryEntries/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry.clone()))
        .expect(1)
        .mount(&fixture.api)
        .await;

    let request = McpRequest::new(3i64, "resources/read")
        .with_params(json!({"uri": "loopio://libraryEntry/12"}));
    let response = fixture.server.handle_request(request).await.unwrap();
    let result = response.result.expect("result");

    let contents = &result["contents"][0];
    assert_eq!(contents["uri"], "loopio://libraryEntry/12");
    assert_eq!(contents["mimeType"], "application/json");
    assert_eq!(
        contents["text"],
        serde_json::to_string_pretty(&entry).unwrap()
    );
}

#[tokio::test]
async fn test_read_missing_library_entry_is_rpc_error() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/libraryEntries/13"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&fixture.api)
        .await;

    let request = McpRequest::new(4i64, "resources/read")
        .with_params(json!({"uri": "loopio://libraryEntry/13"}));
    let response = fixture.server.handle_request(request).await.unwrap();

    let error = response.error.expect("error");
    assert_eq!(error.code, McpError::INTERNAL_ERROR);
    assert!(error.message.contains("404"));
}

#[tokio::test]
async fn test_prompt_get() {
    let fixture = TestFixture::new().await;

    let request = McpRequest::new(5i64, "prompts/get").with_params(json!({
        "name": "searchLibraryEntries",
        "arguments": {"query": "SOC 2"}
    }));
    let response = fixture.server.handle_request(request).await.unwrap();
    let result = response.result.expect("result");

    assert_eq!(
        result["messages"][0]["content"]["text"],
        "Please search the Loopio library for entries related to: \"SOC 2\". \
         Use the listLibraryEntries tool with appropriate filters."
    );
}

#[tokio::test]
async fn test_stdio_session() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/customers/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Acme"})))
        .mount(&fixture.api)
        .await;

    let server = Arc::new(fixture.server);
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_side);
    let session = tokio::spawn(serve(server, BufReader::new(server_read), server_write));

    let (client_read, mut client_write) = tokio::io::split(client_side);
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
               "params": {"name": "getCustomer", "arguments": {"customerId": 9}}}),
    ];
    for message in &input {
        client_write
            .write_all(format!("{}\n", message).as_bytes())
            .await
            .unwrap();
    }
    client_write.shutdown().await.unwrap();

    let mut lines = BufReader::new(client_read).lines();
    let mut responses = Vec::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        responses.push(serde_json::from_str::<Value>(&line).unwrap());
    }
    session.await.unwrap().unwrap();

    assert_eq!(responses.len(), 2);
    let initialize = responses.iter().find(|r| r["id"] == 1).unwrap();
    assert_eq!(initialize["result"]["serverInfo"]["name"], "loopio-mcp");

    let customer = responses.iter().find(|r| r["id"] == 2).unwrap();
    assert_eq!(customer["result"]["isError"], false);
    assert!(customer["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Acme"));
}
