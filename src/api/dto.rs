//! Data Transfer Objects for API requests.
//!
//! Query and body shapes are deliberately loose (`Option` everywhere) so that
//! missing fields surface as field-level validation errors instead of
//! extractor rejections. Each DTO converts into its typed domain request.

use serde::Deserialize;
use serde_json::Value;

use super::error::ValidationError;
use crate::domain::{
    CreateDeployment, DeploymentStatus, Raw, RawById, ReadEnvironment, ReadPlatform,
};

/// Page used when the query omits one.
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when the query omits one.
pub const DEFAULT_RANGE_LIMIT: u32 = 20;

/// Largest accepted page size.
pub const MAX_RANGE_LIMIT: u32 = 500;

/// Longest accepted value for any text field, in characters.
pub const MAX_FIELD_LENGTH: usize = 255;

// =============================================================================
// Request DTOs
// =============================================================================

/// Body of `POST /create`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateVersionRequest {
    pub workload: Option<String>,
    pub platform: Option<String>,
    pub environment: Option<String>,
    pub version: Option<String>,
    pub changelog_url: Option<String>,
    /// Free-form payload; strings are stored as is, anything else as JSON text.
    pub raw: Option<Value>,
    /// `deployed`, `failed` or `unknown` (default).
    pub status: Option<String>,
}

impl CreateVersionRequest {
    /// Validates and converts into a domain request.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn into_request(self) -> Result<CreateDeployment, ValidationError> {
        let mut errors = ValidationError::default();

        let workload = required_text(&mut errors, "workload", self.workload);
        let platform = required_text(&mut errors, "platform", self.platform);
        let environment = required_text(&mut errors, "environment", self.environment);
        let version = required_text(&mut errors, "version", self.version);
        let changelog_url = optional_text(&mut errors, "changelog_url", self.changelog_url);

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => DeploymentStatus::default(),
            Some(value) => value.parse().unwrap_or_else(|_| {
                errors.push("status", "status must be one of deployed, failed, unknown");
                DeploymentStatus::default()
            }),
        };

        let raw = self.raw.and_then(|raw| match raw {
            Value::Null => None,
            Value::String(text) => Some(text),
            other => Some(other.to_string()),
        });

        errors.into_result(CreateDeployment {
            workload,
            platform,
            environment,
            version,
            changelog_url,
            raw,
            status,
        })
    }
}

/// Query of `GET /read/environment`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadEnvironmentQuery {
    pub workload: Option<String>,
    pub platform: Option<String>,
    pub environment: Option<String>,
    pub page: Option<i64>,
    pub range_limit: Option<i64>,
}

impl ReadEnvironmentQuery {
    /// Validates and converts into a domain request.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn into_request(self) -> Result<ReadEnvironment, ValidationError> {
        let mut errors = ValidationError::default();

        let workload = required_text(&mut errors, "workload", self.workload);
        let platform = required_text(&mut errors, "platform", self.platform);
        let environment = required_text(&mut errors, "environment", self.environment);
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let range_limit = range_limit(&mut errors, self.range_limit);

        errors.into_result(ReadEnvironment {
            workload,
            platform,
            environment,
            page,
            range_limit,
        })
    }
}

/// Query of `GET /read/platform`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadPlatformQuery {
    pub workload: Option<String>,
    pub platform: Option<String>,
    pub page: Option<i64>,
    pub range_limit: Option<i64>,
}

impl ReadPlatformQuery {
    /// Validates and converts into a domain request.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn into_request(self) -> Result<ReadPlatform, ValidationError> {
        let mut errors = ValidationError::default();

        let workload = required_text(&mut errors, "workload", self.workload);
        let platform = required_text(&mut errors, "platform", self.platform);
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let range_limit = range_limit(&mut errors, self.range_limit);

        errors.into_result(ReadPlatform {
            workload,
            platform,
            page,
            range_limit,
        })
    }
}

/// Query of `GET /raw`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawQuery {
    pub workload: Option<String>,
    pub platform: Option<String>,
    pub environment: Option<String>,
    pub version: Option<String>,
}

impl RawQuery {
    /// Validates and converts into a domain request.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn into_request(self) -> Result<Raw, ValidationError> {
        let mut errors = ValidationError::default();

        let workload = required_text(&mut errors, "workload", self.workload);
        let platform = required_text(&mut errors, "platform", self.platform);
        let environment = required_text(&mut errors, "environment", self.environment);
        let version = required_text(&mut errors, "version", self.version);

        errors.into_result(Raw {
            workload,
            platform,
            environment,
            version,
        })
    }
}

/// Parses the `{versions_id}` path segment.
///
/// # Errors
///
/// Returns a validation error unless the segment is a positive integer.
pub fn parse_versions_id(segment: &str) -> Result<RawById, ValidationError> {
    match segment.trim().parse::<i64>() {
        Ok(versions_id) if versions_id > 0 => Ok(RawById { versions_id }),
        _ => Err(ValidationError::single(
            "versions_id",
            "versions_id must be a positive integer",
        )),
    }
}

// =============================================================================
// Field Validation
// =============================================================================

fn required_text(errors: &mut ValidationError, field: &str, value: Option<String>) -> String {
    let value = value.map(|value| value.trim().to_string()).unwrap_or_default();

    if value.is_empty() {
        errors.push(field, format!("{field} is required"));
    } else if value.chars().count() > MAX_FIELD_LENGTH {
        errors.push(
            field,
            format!("{field} must not exceed {MAX_FIELD_LENGTH} characters"),
        );
    }

    value
}

fn optional_text(
    errors: &mut ValidationError,
    field: &str,
    value: Option<String>,
) -> Option<String> {
    let value = value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())?;

    if value.chars().count() > MAX_FIELD_LENGTH {
        errors.push(
            field,
            format!("{field} must not exceed {MAX_FIELD_LENGTH} characters"),
        );
    }

    Some(value)
}

fn range_limit(errors: &mut ValidationError, value: Option<i64>) -> u32 {
    let Some(value) = value else {
        return DEFAULT_RANGE_LIMIT;
    };

    match u32::try_from(value) {
        Ok(limit) if limit <= MAX_RANGE_LIMIT => limit,
        _ => {
            errors.push(
                "range_limit",
                format!("range_limit must be between 0 and {MAX_RANGE_LIMIT}"),
            );
            DEFAULT_RANGE_LIMIT
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
