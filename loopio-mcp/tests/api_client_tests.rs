//! Integration tests for the Loopio request executor.
//!
//! A wiremock server stands in for the Loopio data API. These tests cover
//! authentication headers, query encoding, JSON Patch bodies, and the way
//! error and empty responses come back to callers.

use loopio_auth::{ClientCredentialsConfig, StaticToken, TokenManager, TokenSource};
use loopio_mcp::clients::endpoints::{
    DELETE_LIBRARY_ENTRY, GET_LIBRARY_ENTRY, LIST_LIBRARY_ENTRIES, LIST_PROJECTS,
    UPDATE_LIBRARY_ENTRY,
};
use loopio_mcp::{ApiClient, ApiResponse, ClientError, LoopioConfig};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client pointed at the mock server with a fixed token.
fn client_for(server: &MockServer, token: &str) -> ApiClient {
    let config = LoopioConfig::new("test-client", "test-secret").with_base_url(server.uri());
    ApiClient::new(&config, Arc::new(StaticToken::new(token))).expect("client builds")
}

/// Token source that never has a token.
struct NoToken;

impl TokenSource for NoToken {
    fn current_token(&self) -> Option<String> {
        None
    }
}

#[tokio::test]
async fn test_get_sends_bearer_token_and_parses_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/libraryEntries/42"))
        .and(header("authorization", "Bearer abc123"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "questions": [{"text": "Is data encrypted at rest?"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "abc123");
    let request = GET_LIBRARY_ENTRY
        .request(&json!({"libraryEntryId": 42}), None)
        .unwrap();

    let response = client.execute(request).await.unwrap();
    assert_eq!(response.into_value()["id"], 42);
}

#[tokio::test]
async fn test_paging_and_filter_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/libraryEntries"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "50"))
        .and(query_param("filter", r#"{"searchQuery":"encryption"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "totalItems": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "t");
    let request = LIST_LIBRARY_ENTRIES
        .request(
            &json!({"page": 2, "pageSize": 50, "filter": {"searchQuery": "encryption"}}),
            None,
        )
        .unwrap();

    let page = client.execute(request).await.unwrap().into_value();
    assert_eq!(page["totalItems"], 0);
}

#[tokio::test]
async fn test_repeated_query_values() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("rfxTypes", "RFP"))
        .and(query_param("rfxTypes", "RFI"))
        .and(query_param("owners", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "t");
    let request = LIST_PROJECTS
        .request(&json!({"rfxTypes": ["RFP", "RFI"], "owners": [7]}), None)
        .unwrap();

    client.execute(request).await.unwrap();
}

#[tokio::test]
async fn test_json_patch_body_and_content_type() {
    let server = MockServer::start().await;
    let operations = json!([
        {"op": "replace", "path": "/answer/text", "value": "Yes, AES-256."},
        {"op": "remove", "path": "/tags/0"}
    ]);

    Mock::given(method("PATCH"))
        .and(path("/libraryEntries/42"))
        .and(header("content-type", "application/json-patch+json"))
        .and(body_json(operations.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "t");
    let request = UPDATE_LIBRARY_ENTRY
        .request(&json!({"libraryEntryId": 42}), Some(operations))
        .unwrap();

    let response = client.execute(request).await.unwrap();
    assert_eq!(response, ApiResponse::Json(json!({"id": 42})));
}

#[tokio::test]
async fn test_no_content_response() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/libraryEntries/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "t");
    let request = DELETE_LIBRARY_ENTRY
        .request(&json!({"libraryEntryId": 42}), None)
        .unwrap();

    let response = client.execute(request).await.unwrap();
    assert!(response.is_no_content());
    assert_eq!(response.into_value(), json!({}));
}

#[tokio::test]
async fn test_empty_success_body_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/libraryEntries/9"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/libraryEntries/10"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .mount(&server)
        .await;

    let client = client_for(&server, "t");

    for id in [9, 10] {
        let request = DELETE_LIBRARY_ENTRY
            .request(&json!({"libraryEntryId": id}), None)
            .unwrap();
        let err = client.execute(request).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)), "{}: {:?}", id, err);
    }
}

#[tokio::test]
async fn test_repeated_get_is_stable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 1, "name": "Acme RFP", "owner": {"id": 7}}],
            "totalItems": 1
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, "t");
    let request = || LIST_PROJECTS.request(&json!({"page": 1}), None).unwrap();

    let first = client.execute(request()).await.unwrap();
    let second = client.execute(request()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_not_found_error_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/libraryEntries/999"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not found"}"#))
        .mount(&server)
        .await;

    let client = client_for(&server, "t");
    let request = GET_LIBRARY_ENTRY
        .request(&json!({"libraryEntryId": 999}), None)
        .unwrap();

    let err = client.execute(request).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.to_string(),
        r#"Loopio API request failed: 404 Not Found - {"message":"Not found"}"#
    );
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/libraryEntries/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "t");
    let request = GET_LIBRARY_ENTRY
        .request(&json!({"libraryEntryId": 1}), None)
        .unwrap();

    let err = client.execute(request).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, ref body, .. } if body == "boom"));
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/libraryEntries/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, "t");
    let request = GET_LIBRARY_ENTRY
        .request(&json!({"libraryEntryId": 1}), None)
        .unwrap();

    let err = client.execute(request).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let config = LoopioConfig::new("id", "secret").with_base_url(server.uri());
    let client = ApiClient::new(&config, Arc::new(NoToken)).unwrap();
    let request = GET_LIBRARY_ENTRY
        .request(&json!({"libraryEntryId": 1}), None)
        .unwrap();

    let err = client.execute(request).await.unwrap_err();
    assert!(matches!(err, ClientError::NotAuthenticated));
}

#[tokio::test]
async fn test_requests_follow_refreshed_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "first"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "second"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/libraryEntries/1"))
        .and(header("authorization", "Bearer first"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "first"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/libraryEntries/1"))
        .and(header("authorization", "Bearer second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "second"})))
        .mount(&server)
        .await;

    let credentials = ClientCredentialsConfig::new("id", "secret")
        .with_token_url(format!("{}/oauth2/access_token", server.uri()));
    let manager = TokenManager::new(credentials).unwrap();
    let config = LoopioConfig::new("id", "secret").with_base_url(server.uri());
    let client = ApiClient::new(&config, Arc::new(manager.handle())).unwrap();
    let request = || {
        GET_LIBRARY_ENTRY
            .request(&json!({"libraryEntryId": 1}), None)
            .unwrap()
    };

    manager.acquire_token().await.unwrap();
    let before = client.execute(request()).await.unwrap().into_value();
    assert_eq!(before["token"], "first");

    manager.acquire_token().await.unwrap();
    let after = client.execute(request()).await.unwrap().into_value();
    assert_eq!(after["token"], "second");
}
