//! End-to-end tests: MCP requests through the real HTTP backend client
//! against a fake backend served by axum.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use ccow_backend::{HttpBackendClient, endpoints};
use ccow_core::{CcowConfig, Credentials};
use ccow_mcp::{JsonRpcRequest, McpServer};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeBackend {
    check_page_sizes: Mutex<Vec<u64>>,
    authorizations: Mutex<Vec<String>>,
}

async fn categories(
    State(fake): State<Arc<FakeBackend>>,
    headers: HeaderMap,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    fake.authorizations.lock().unwrap().push(auth);
    Json(json!([{"id": "c1", "name": "Security"}, {"id": "c2", "name": "Privacy"}]))
}

/// Times out at page size 5 and answers at any larger size.
async fn checks(
    State(fake): State<Arc<FakeBackend>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let size = body["pageSize"].as_u64().unwrap_or_default();
    fake.check_page_sizes.lock().unwrap().push(size);
    if size <= 5 {
        return (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({"description": "upstream timed out"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "items": [
                {"name": "encryption", "complianceStatus": "NON_COMPLIANT"},
                {"name": "versioning", "complianceStatus": "COMPLIANT"}
            ],
            "totalItems": 2
        })),
    )
}

async fn dashboard_summary() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"Description": "No recent run for ccf plans"})),
    )
}

async fn start_backend() -> (String, Arc<FakeBackend>) {
    let fake = Arc::new(FakeBackend::default());
    let app = Router::new()
        .route(endpoints::ASSESSMENT_CATEGORIES, get(categories))
        .route(endpoints::FETCH_CHECKS, post(checks))
        .route(endpoints::CCF_DASHBOARD_FRAMEWORK_SUMMARY, post(dashboard_summary))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), fake)
}

async fn server(base_url: &str) -> McpServer {
    let client = HttpBackendClient::new(
        base_url,
        Some(&Credentials::Token("test-token".to_string())),
        Duration::from_secs(5),
    )
    .unwrap();
    McpServer::new(&CcowConfig::default(), Arc::new(client)).unwrap()
}

async fn call(server: &McpServer, name: &str, arguments: Value) -> Value {
    let response = server
        .handle_request(JsonRpcRequest::new(
            1,
            "tools/call",
            Some(json!({"name": name, "arguments": arguments})),
        ))
        .await;
    assert!(response.error.is_none(), "{:?}", response.error);
    response.result.unwrap()
}

#[tokio::test]
async fn test_categories_over_http() {
    let (url, fake) = start_backend().await;
    let server = server(&url).await;

    let result = call(&server, "list_all_assessment_categories", json!({})).await;

    assert_eq!(result["isError"], false);
    let categories = &result["content"][0]["json"]["categories"];
    assert_eq!(categories.as_array().unwrap().len(), 2);
    assert_eq!(fake.authorizations.lock().unwrap().as_slice(), ["test-token"]);
}

#[tokio::test]
async fn test_gateway_timeout_climbs_ladder() {
    let (url, fake) = start_backend().await;
    let server = server(&url).await;

    let result = call(
        &server,
        "fetch_checks",
        json!({"id": "run-1", "resourceType": "aws_s3_bucket"}),
    )
    .await;

    assert_eq!(result["isError"], false);
    let page = &result["content"][0]["json"];
    assert_eq!(page["pageSize"], 10);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(fake.check_page_sizes.lock().unwrap().as_slice(), [5, 10]);
}

#[tokio::test]
async fn test_upstream_error_is_structured() {
    let (url, _fake) = start_backend().await;
    let server = server(&url).await;

    let result = call(&server, "get_dashboard_data", json!({"period": "Q1 2025"})).await;

    assert_eq!(result["isError"], true);
    let error = &result["content"][0]["json"]["error"];
    assert_eq!(error["kind"], "upstream");
    assert_eq!(error["status"], 400);
    assert_eq!(
        error["message"],
        "There is no data found for the review period: Q1 2025"
    );
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_backend() {
    let (url, fake) = start_backend().await;
    let server = server(&url).await;

    let result = call(
        &server,
        "fetch_checks",
        json!({"id": "run-1", "resourceType": "aws_s3_bucket", "page": 0}),
    )
    .await;

    assert_eq!(result["isError"], true);
    assert_eq!(result["content"][0]["json"]["error"]["kind"], "validation");
    assert!(fake.check_page_sizes.lock().unwrap().is_empty());
}
