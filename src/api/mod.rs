//! API module for HTTP handlers.
//!
//! This module contains route definitions and request/response handlers.

pub mod dto;
pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};

pub use dto::{
    CreateVersionRequest, DEFAULT_PAGE, DEFAULT_RANGE_LIMIT, MAX_FIELD_LENGTH, MAX_RANGE_LIMIT,
    RawQuery, ReadEnvironmentQuery, ReadPlatformQuery,
};
pub use error::{ApiError, ApiErrorResponse, FieldError, ValidationError};
pub use handlers::{
    AppState, HealthResponse, X_CACHE, build_cache_headers, create_version, health_check, raw,
    raw_by_id, read_distinct_workloads, read_environment, read_home, read_platform,
};

/// Mount point of every versions route.
pub const API_PREFIX: &str = "/api/v1/versions";

/// Builds the application router without transport layers.
pub fn router(state: AppState) -> Router {
    let versions = Router::new()
        .route("/health", get(health_check))
        .route("/create", post(create_version))
        .route("/read/environment", get(read_environment))
        .route("/read/platform", get(read_platform))
        .route("/read/home", get(read_home))
        .route("/read/distinct/workloads", get(read_distinct_workloads))
        .route("/raw", get(raw))
        .route("/raw/{versions_id}", get(raw_by_id));

    Router::new()
        .nest(API_PREFIX, versions)
        .with_state(state)
}
