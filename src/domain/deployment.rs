//! Deployment catalog rows.
//!
//! These are the result shapes the gateways produce and the cache stores as
//! JSON. Typed rows cover the listing reads; [`RawRecord`] carries the
//! heterogeneous `raw`/`raw_by_id` results.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Deployment Status
// =============================================================================

/// Outcome recorded for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// The version reached the environment.
    Deployed,
    /// The deployment was attempted and failed.
    Failed,
    /// The reporter did not know the outcome.
    #[default]
    Unknown,
}

impl DeploymentStatus {
    /// Storage representation shared by both engines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deployed => "deployed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "deployed" => Ok(Self::Deployed),
            "failed" => Ok(Self::Failed),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Unknown deployment status: {value}")),
        }
    }
}

// =============================================================================
// Rows
// =============================================================================

/// One recorded deployment, as returned by environment, platform and home reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRow {
    pub versions_id: i64,
    pub workload: String,
    pub platform: String,
    pub environment: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_url: Option<String>,
    pub status: DeploymentStatus,
    pub date: DateTime<Utc>,
}

/// A distinct workload name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRow {
    pub workload: String,
}

/// Column name to value association for a single raw row.
///
/// Columns are kept in key order. NULL columns are left out, so two records
/// need not share the same keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, skipping `None`.
    pub fn insert(&mut self, column: impl Into<String>, value: Option<Value>) {
        if let Some(value) = value {
            self.0.insert(column.into(), value);
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Embeds a `raw` column payload: JSON documents stay structured, anything
/// else is kept as a string.
#[must_use]
pub fn raw_payload_value(payload: &str) -> Value {
    serde_json::from_str(payload).unwrap_or_else(|_| Value::String(payload.to_string()))
}

// =============================================================================
// Result Set Emptiness
// =============================================================================

/// Result sets the cache layer can reason about.
///
/// Empty results are never written to the cache.
pub trait ResultSet {
    fn is_empty_result(&self) -> bool;
}

impl<T> ResultSet for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl ResultSet for RawRecord {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("deployed", DeploymentStatus::Deployed)]
    #[case("FAILED", DeploymentStatus::Failed)]
    #[case("Unknown", DeploymentStatus::Unknown)]
    fn test_status_from_str(#[case] input: &str, #[case] expected: DeploymentStatus) {
        assert_eq!(input.parse::<DeploymentStatus>().unwrap(), expected);
        assert_eq!(expected.to_string(), input.to_lowercase());
    }

    #[rstest]
    fn test_status_from_str_invalid() {
        assert!("rolled_back".parse::<DeploymentStatus>().is_err());
    }

    #[rstest]
    fn test_raw_record_skips_null_columns() {
        let mut record = RawRecord::new();
        record.insert("workload", Some(json!("billing")));
        record.insert("changelog_url", None);
        assert_eq!(record.len(), 1);
        assert!(record.get("changelog_url").is_none());
    }

    #[rstest]
    fn test_raw_record_serializes_as_plain_object() {
        let mut record = RawRecord::new();
        record.insert("versions_id", Some(json!(7)));
        record.insert("raw", Some(raw_payload_value(r#"{"sha":"abc"}"#)));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"versions_id": 7, "raw": {"sha": "abc"}}));
    }

    #[rstest]
    #[case("plain text", json!("plain text"))]
    #[case("[1,2]", json!([1, 2]))]
    fn test_raw_payload_value(#[case] payload: &str, #[case] expected: Value) {
        assert_eq!(raw_payload_value(payload), expected);
    }

    #[rstest]
    fn test_result_set_emptiness() {
        assert!(Vec::<WorkloadRow>::new().is_empty_result());
        assert!(RawRecord::new().is_empty_result());
        assert!(!vec![WorkloadRow {
            workload: "api".to_string()
        }]
        .is_empty_result());
    }
}
