//! HTTP handlers for the versions API.
//!
//! Handlers validate input, call the [`CachedCatalog`] and translate its
//! outcomes into status codes:
//!
//! | outcome            | keyed lookups | listings |
//! |--------------------|---------------|----------|
//! | rows found         | 200           | 200      |
//! | empty result       | 404           | 204      |
//! | service failure    | 500           | 500      |
//!
//! Successful reads carry an `X-Cache` header with the cache status.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::dto::{
    CreateVersionRequest, RawQuery, ReadEnvironmentQuery, ReadPlatformQuery, parse_versions_id,
};
use super::error::ApiErrorResponse;
use crate::infrastructure::{CacheResult, CacheStatus, CachedCatalog, ReadOutcome};

/// Cache status header attached to successful reads.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
#[derive(Clone, Debug)]
pub struct AppState {
    pub catalog: CachedCatalog,
}

impl AppState {
    #[must_use]
    pub const fn new(catalog: CachedCatalog) -> Self {
        Self { catalog }
    }
}

// =============================================================================
// POST /create Handler
// =============================================================================

/// Records a deployment.
///
/// # Response
///
/// - **201 Created**: `"OK"`
/// - **400 Bad Request**: Validation error
/// - **500 Internal Server Error**: Database error
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] on invalid input or backend failure.
pub async fn create_version(
    State(state): State<AppState>,
    payload: Result<Json<CreateVersionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<&'static str>), ApiErrorResponse> {
    let Json(payload) = payload?;
    let request = payload.into_request()?;

    let outcome = state.catalog.create(&request).await?;
    tracing::info!(
        workload = %request.workload,
        platform = %request.platform,
        environment = %request.environment,
        version = %request.version,
        invalidated = ?outcome.invalidated,
        "Deployment recorded"
    );

    Ok((StatusCode::CREATED, Json("OK")))
}

// =============================================================================
// GET /read/* Handlers
// =============================================================================

/// Deployments of one environment, newest first.
///
/// # Errors
///
/// Returns 400 on invalid input, 404 when nothing matches, 500 on failure.
pub async fn read_environment(
    State(state): State<AppState>,
    query: Result<Query<ReadEnvironmentQuery>, QueryRejection>,
) -> Result<Response, ApiErrorResponse> {
    let Query(query) = query?;
    let request = query.into_request()?;

    let result = state.catalog.read_environment(&request).await?;
    found_or_not_found(result, "No deployment found for this environment")
}

/// Deployments across a platform, newest first.
///
/// # Errors
///
/// Returns 400 on invalid input, 404 when nothing matches, 500 on failure.
pub async fn read_platform(
    State(state): State<AppState>,
    query: Result<Query<ReadPlatformQuery>, QueryRejection>,
) -> Result<Response, ApiErrorResponse> {
    let Query(query) = query?;
    let request = query.into_request()?;

    let result = state.catalog.read_platform(&request).await?;
    found_or_not_found(result, "No deployment found for this platform")
}

/// Latest deployments across the catalog.
///
/// # Errors
///
/// Returns 500 on failure; an empty catalog is 204.
pub async fn read_home(State(state): State<AppState>) -> Result<Response, ApiErrorResponse> {
    let result = state.catalog.read_home().await?;
    Ok(found_or_no_content(result))
}

/// Distinct workload names.
///
/// # Errors
///
/// Returns 500 on failure; an empty catalog is 204.
pub async fn read_distinct_workloads(
    State(state): State<AppState>,
) -> Result<Response, ApiErrorResponse> {
    let result = state.catalog.read_distinct_workloads().await?;
    Ok(found_or_no_content(result))
}

// =============================================================================
// GET /raw Handlers
// =============================================================================

/// Raw row of the latest deployment matching all four coordinates.
///
/// # Errors
///
/// Returns 400 on invalid input, 404 when nothing matches, 500 on failure.
pub async fn raw(
    State(state): State<AppState>,
    query: Result<Query<RawQuery>, QueryRejection>,
) -> Result<Response, ApiErrorResponse> {
    let Query(query) = query?;
    let request = query.into_request()?;

    let result = state.catalog.raw(&request).await?;
    found_or_not_found(result, "No deployment found")
}

/// Raw row of one deployment.
///
/// # Errors
///
/// Returns 400 on a malformed id, 404 when absent, 500 on failure.
pub async fn raw_by_id(
    State(state): State<AppState>,
    versions_id: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiErrorResponse> {
    let Path(versions_id) = versions_id?;
    let request = parse_versions_id(&versions_id)?;

    let result = state.catalog.raw_by_id(&request).await?;
    found_or_not_found(result, "No deployment found")
}

// =============================================================================
// GET /health Handler
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// SQL engine in use.
    pub engine: &'static str,
    pub cache_enabled: bool,
}

/// Liveness probe. Does not touch the database or the cache.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        engine: state.catalog.engine(),
        cache_enabled: state.catalog.cache_enabled(),
    })
}

// =============================================================================
// Response Helpers
// =============================================================================

/// Builds the `X-Cache` header for a cache status.
#[must_use]
pub fn build_cache_headers(cache_status: CacheStatus) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_CACHE, HeaderValue::from_static(cache_status.as_str()));
    headers
}

fn found_or_not_found<T: Serialize>(
    result: CacheResult<ReadOutcome<T>>,
    message: &str,
) -> Result<Response, ApiErrorResponse> {
    match result.value {
        ReadOutcome::Found(value) => {
            Ok((build_cache_headers(result.cache_status), Json(value)).into_response())
        }
        ReadOutcome::Empty => Err(ApiErrorResponse::not_found(message)),
    }
}

fn found_or_no_content<T: Serialize>(result: CacheResult<ReadOutcome<T>>) -> Response {
    match result.value {
        ReadOutcome::Found(value) => {
            (build_cache_headers(result.cache_status), Json(value)).into_response()
        }
        ReadOutcome::Empty => StatusCode::NO_CONTENT.into_response(),
    }
}

// =============================================================================
// Tests
// =============================================================================
