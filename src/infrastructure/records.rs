//! Row decoding shared by the SQL gateways.
//!
//! Both engines select the same projection into [`DeploymentRecord`], so the
//! conversion to domain rows is written once and the engines cannot drift.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{DeploymentRow, DeploymentStatus, RawRecord, raw_payload_value};
use crate::infrastructure::GatewayError;

/// Number of deployments listed by the home read.
pub const HOME_DEPLOYMENT_LIMIT: i64 = 10;

/// Projection selected by every deployment query.
pub(crate) const DEPLOYMENT_COLUMNS: &str =
    "versions_id, workload, platform, environment, version, changelog_url, raw, status, date";

/// A `versions` row as both engines return it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct DeploymentRecord {
    pub versions_id: i64,
    pub workload: String,
    pub platform: String,
    pub environment: String,
    pub version: String,
    pub changelog_url: Option<String>,
    pub raw: Option<String>,
    pub status: String,
    pub date: DateTime<Utc>,
}

impl DeploymentRecord {
    /// Converts into the typed listing row.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Decode` if the stored status is unknown.
    pub fn into_row(self) -> Result<DeploymentRow, GatewayError> {
        let status = self
            .status
            .parse::<DeploymentStatus>()
            .map_err(GatewayError::Decode)?;
        Ok(DeploymentRow {
            versions_id: self.versions_id,
            workload: self.workload,
            platform: self.platform,
            environment: self.environment,
            version: self.version,
            changelog_url: self.changelog_url,
            status,
            date: self.date,
        })
    }

    /// Converts into a raw column map, dropping NULL columns.
    pub fn into_raw_record(self) -> RawRecord {
        let mut record = RawRecord::new();
        record.insert("versions_id", Some(Value::from(self.versions_id)));
        record.insert("workload", Some(Value::String(self.workload)));
        record.insert("platform", Some(Value::String(self.platform)));
        record.insert("environment", Some(Value::String(self.environment)));
        record.insert("version", Some(Value::String(self.version)));
        record.insert("changelog_url", self.changelog_url.map(Value::String));
        record.insert("raw", self.raw.as_deref().map(raw_payload_value));
        record.insert("status", Some(Value::String(self.status)));
        record.insert("date", Some(Value::String(self.date.to_rfc3339())));
        record
    }
}

/// Converts a batch of records, failing on the first undecodable row.
pub(crate) fn into_rows(records: Vec<DeploymentRecord>) -> Result<Vec<DeploymentRow>, GatewayError> {
    records.into_iter().map(DeploymentRecord::into_row).collect()
}

/// Converts an optional single record into a raw map (empty when absent).
pub(crate) fn into_raw_record(record: Option<DeploymentRecord>) -> RawRecord {
    record.map_or_else(RawRecord::new, DeploymentRecord::into_raw_record)
}
