//! Backend gateway trait for the deployment catalog.
//!
//! One implementation exists per supported storage engine
//! ([`PostgresGateway`](super::PostgresGateway) and
//! [`MysqlGateway`](super::MysqlGateway)). The engine is chosen once at
//! startup by the factory and never switched per request.
//!
//! Methods return boxed `'static` futures so the trait stays object safe and
//! can be shared as `Arc<dyn BackendGateway>`.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{
    CreateDeployment, DeploymentRow, Raw, RawById, RawRecord, ReadEnvironment, ReadPlatform,
    WorkloadRow,
};

// =============================================================================
// Gateway Error
// =============================================================================

/// Errors raised by a storage engine.
///
/// "No rows" is never an error: reads return an empty result instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The engine failed to execute a statement.
    #[error("Database error: {0}")]
    Database(String),

    /// A returned row could not be decoded.
    #[error("Row decode error: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for GatewayError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Decode(error.to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

/// Result alias for gateway futures.
pub type GatewayFuture<T> = BoxFuture<'static, Result<T, GatewayError>>;

// =============================================================================
// Backend Gateway
// =============================================================================

/// Capability set every storage engine implements.
///
/// Implementations must be behaviorally equivalent: the same inputs over the
/// same stored data yield the same rows, ordered newest first for deployment
/// listings and by name for workloads.
pub trait BackendGateway: Send + Sync {
    /// Short engine name for logs.
    fn engine(&self) -> &'static str;

    /// Inserts a deployment.
    fn create(&self, request: &CreateDeployment) -> GatewayFuture<()>;

    /// Deployments of one environment, windowed by the request's page.
    fn read_environment(&self, request: &ReadEnvironment) -> GatewayFuture<Vec<DeploymentRow>>;

    /// Deployments across a platform, windowed by the request's page.
    fn read_platform(&self, request: &ReadPlatform) -> GatewayFuture<Vec<DeploymentRow>>;

    /// The most recent deployments across the whole catalog.
    fn read_home(&self) -> GatewayFuture<Vec<DeploymentRow>>;

    /// Every workload name, once.
    fn read_distinct_workloads(&self) -> GatewayFuture<Vec<WorkloadRow>>;

    /// Latest deployment matching all four coordinates, empty if none.
    fn raw(&self, request: &Raw) -> GatewayFuture<RawRecord>;

    /// Deployment by identifier, empty if none.
    fn raw_by_id(&self, request: &RawById) -> GatewayFuture<RawRecord>;
}
