//! HTTP surface tests.
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`,
//! backed by the recording gateway and an in-memory cache.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use rstest::rstest;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{FaultyCacheStore, RecordingGateway, app_state, billing_on_prod};
use versions_api::api::{ApiError, X_CACHE, router};
use versions_api::domain::Operation;
use versions_api::infrastructure::{CacheStore, DisabledCacheStore, InMemoryCacheStore};

// =============================================================================
// Helpers
// =============================================================================

fn application(gateway: &RecordingGateway, store: Arc<dyn CacheStore>) -> Router {
    router(app_state(gateway, store))
}

async fn send(application: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = application.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

async fn get(application: &Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(application, request).await
}

async fn post_json(application: &Router, body: String) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/versions/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    send(application, request).await
}

fn api_error(body: &Bytes) -> ApiError {
    serde_json::from_slice(body).unwrap()
}

fn create_body() -> Value {
    json!({
        "workload": "billing",
        "platform": "prod",
        "environment": "eu-west",
        "version": "1.4.0",
        "changelog_url": "https://example.com/changelog/1.4.0",
        "raw": {"commit": "abc123"},
        "status": "deployed"
    })
}

// =============================================================================
// POST /create
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_create_returns_created() {
    let gateway = RecordingGateway::new();
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = post_json(&application, create_body().to_string()).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.as_ref(), br#""OK""#);
    assert_eq!(gateway.row_count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_create_then_read_sees_new_row() {
    let gateway = RecordingGateway::with_rows(billing_on_prod());
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));
    let uri = "/api/v1/versions/read/platform?workload=billing&platform=prod";

    let (_, headers, _) = get(&application, uri).await;
    assert_eq!(headers.get(X_CACHE).unwrap(), "MISS");
    let (_, headers, _) = get(&application, uri).await;
    assert_eq!(headers.get(X_CACHE).unwrap(), "HIT");

    let (status, _, _) = post_json(&application, create_body().to_string()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, headers, body) = get(&application, uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(X_CACHE).unwrap(), "MISS");
    let rows: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["version"], "1.4.0");
    assert_eq!(rows[0]["status"], "deployed");
}

#[rstest]
#[case(json!({"platform": "prod", "environment": "eu-west", "version": "1"}), "workload")]
#[case(json!({"workload": " ", "platform": "prod", "environment": "eu-west", "version": "1"}), "workload")]
#[case(json!({"workload": "a", "platform": "prod", "environment": "eu-west"}), "version")]
#[case(json!({"workload": "a", "platform": "prod", "environment": "eu-west", "version": "1", "status": "rolled"}), "status")]
#[tokio::test]
async fn test_create_rejects_invalid_fields(#[case] body: Value, #[case] field: &str) {
    let gateway = RecordingGateway::new();
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = post_json(&application, body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = api_error(&body);
    assert_eq!(error.code, "VALIDATION_ERROR");
    let details = error.details.unwrap();
    assert!(details.iter().any(|detail| detail.field == field));
    assert_eq!(gateway.total_calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_create_rejects_malformed_json() {
    let gateway = RecordingGateway::new();
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = post_json(&application, "{\"workload\":".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(api_error(&body).code, "INVALID_BODY");
}

#[rstest]
#[tokio::test]
async fn test_create_backend_failure_is_generic() {
    let gateway = RecordingGateway::new();
    gateway.set_failing(true);
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = post_json(&application, create_body().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!({"code": "INTERNAL_ERROR", "message": "Internal Server Error"})
    );
}

// =============================================================================
// GET /read/*
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_read_environment_paginates() {
    let gateway = RecordingGateway::with_rows(billing_on_prod());
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, headers, body) = get(
        &application,
        "/api/v1/versions/read/environment?workload=billing&platform=prod&environment=eu-west&page=2&range_limit=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(X_CACHE).unwrap(), "MISS");
    let rows: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["versions_id"], 1);
}

#[rstest]
#[case("/api/v1/versions/read/environment?workload=billing&platform=prod&environment=ap-south")]
#[case("/api/v1/versions/read/platform?workload=ledger&platform=prod")]
#[case("/api/v1/versions/raw?workload=billing&platform=prod&environment=eu-west&version=9.9.9")]
#[case("/api/v1/versions/raw/99")]
#[tokio::test]
async fn test_keyed_lookups_without_rows_are_not_found(#[case] uri: &str) {
    let gateway = RecordingGateway::with_rows(billing_on_prod());
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, headers, body) = get(&application, uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.get(X_CACHE).is_none());
    assert_eq!(api_error(&body).code, "NOT_FOUND");
}

#[rstest]
#[case("/api/v1/versions/read/home")]
#[case("/api/v1/versions/read/distinct/workloads")]
#[tokio::test]
async fn test_listings_of_empty_catalog_have_no_content(#[case] uri: &str) {
    let gateway = RecordingGateway::new();
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = get(&application, uri).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_distinct_workloads_are_sorted() {
    let gateway = RecordingGateway::with_rows(billing_on_prod());
    gateway.insert(common::deployment(4, "auth", "prod", "eu-west", "0.1.0", 4));
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = get(&application, "/api/v1/versions/read/distinct/workloads").await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!([{"workload": "auth"}, {"workload": "billing"}]));
}

#[rstest]
#[case("/api/v1/versions/read/platform?platform=prod", "workload")]
#[case("/api/v1/versions/read/platform?workload=billing&platform=prod&range_limit=-1", "range_limit")]
#[case("/api/v1/versions/read/platform?workload=billing&platform=prod&range_limit=501", "range_limit")]
#[case("/api/v1/versions/read/environment?workload=billing&platform=prod", "environment")]
#[case("/api/v1/versions/raw?workload=billing&platform=prod&environment=eu-west", "version")]
#[case("/api/v1/versions/raw/0", "versions_id")]
#[case("/api/v1/versions/raw/abc", "versions_id")]
#[tokio::test]
async fn test_invalid_input_is_bad_request(#[case] uri: &str, #[case] field: &str) {
    let gateway = RecordingGateway::with_rows(billing_on_prod());
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = get(&application, uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = api_error(&body).details.unwrap();
    assert!(details.iter().any(|detail| detail.field == field));
    assert_eq!(gateway.total_calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_non_numeric_page_is_rejected() {
    let gateway = RecordingGateway::with_rows(billing_on_prod());
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = get(
        &application,
        "/api/v1/versions/read/platform?workload=billing&platform=prod&page=first",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(api_error(&body).code, "INVALID_QUERY");
}

// =============================================================================
// Cache Header
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_cache_header_reports_bypass_and_error() {
    let gateway = RecordingGateway::with_rows(billing_on_prod());

    let disabled = application(&gateway, Arc::new(DisabledCacheStore));
    let (_, headers, _) = get(&disabled, "/api/v1/versions/read/home").await;
    assert_eq!(headers.get(X_CACHE).unwrap(), "BYPASS");

    let unavailable = application(&gateway, Arc::new(FaultyCacheStore::unavailable()));
    let (status, headers, _) = get(&unavailable, "/api/v1/versions/read/home").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(X_CACHE).unwrap(), "ERROR");

    assert_eq!(gateway.calls(Operation::ReadHome), 2);
}

#[rstest]
#[tokio::test]
async fn test_raw_by_id_returns_record() {
    let gateway = RecordingGateway::new();
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));
    post_json(&application, create_body().to_string()).await;

    let (status, headers, body) = get(&application, "/api/v1/versions/raw/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(X_CACHE).unwrap(), "MISS");
    let record: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(record["versions_id"], 1);
    assert_eq!(record["raw"], json!({"commit": "abc123"}));
    assert_eq!(
        record["changelog_url"],
        "https://example.com/changelog/1.4.0"
    );
}

#[rstest]
#[tokio::test]
async fn test_corrupt_cache_entry_is_internal_error() {
    use versions_api::domain::ReadPlatform;
    use versions_api::infrastructure::{CACHE_ENTRY_TTL, KeyedRequest};

    let gateway = RecordingGateway::with_rows(billing_on_prod());
    let store = InMemoryCacheStore::new();
    let key = ReadPlatform {
        workload: "billing".to_string(),
        platform: "prod".to_string(),
        page: 1,
        range_limit: 20,
    }
    .cache_key();
    store
        .set(key.as_str(), b"\xff\xfe".to_vec(), CACHE_ENTRY_TTL)
        .await
        .unwrap();
    let application = application(&gateway, Arc::new(store));

    let (status, _, body) = get(
        &application,
        "/api/v1/versions/read/platform?workload=billing&platform=prod",
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(api_error(&body).code, "INTERNAL_ERROR");
}

// =============================================================================
// GET /health
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_health_reports_engine_and_cache() {
    let gateway = RecordingGateway::new();
    let application = application(&gateway, Arc::new(InMemoryCacheStore::new()));

    let (status, _, body) = get(&application, "/api/v1/versions/health").await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["engine"], "recording");
    assert_eq!(body["cache_enabled"], true);
    assert_eq!(gateway.total_calls(), 0);
}
