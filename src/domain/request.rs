//! Typed query requests, one per catalog operation.
//!
//! Requests are built by the HTTP layer after validation and are immutable
//! afterwards. Paginated reads resolve their [`PaginationWindow`] on demand.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::deployment::DeploymentStatus;
use super::pagination::PaginationWindow;

/// Catalog operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    ReadEnvironment,
    ReadPlatform,
    ReadHome,
    ReadDistinctWorkloads,
    Raw,
    RawById,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::ReadEnvironment => "read_environment",
            Self::ReadPlatform => "read_platform",
            Self::ReadHome => "read_home",
            Self::ReadDistinctWorkloads => "read_distinct_workloads",
            Self::Raw => "raw",
            Self::RawById => "raw_by_id",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Records a new deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDeployment {
    pub workload: String,
    pub platform: String,
    pub environment: String,
    pub version: String,
    #[serde(default)]
    pub changelog_url: Option<String>,
    #[serde(default)]
    pub raw: Option<String>,
    pub status: DeploymentStatus,
}

/// Deployments of a workload in one environment of a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadEnvironment {
    pub workload: String,
    pub platform: String,
    pub environment: String,
    pub page: i64,
    pub range_limit: u32,
}

impl ReadEnvironment {
    #[must_use]
    pub const fn window(&self) -> PaginationWindow {
        PaginationWindow::from_page(self.page, self.range_limit)
    }
}

/// Deployments of a workload across every environment of a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPlatform {
    pub workload: String,
    pub platform: String,
    pub page: i64,
    pub range_limit: u32,
}

impl ReadPlatform {
    #[must_use]
    pub const fn window(&self) -> PaginationWindow {
        PaginationWindow::from_page(self.page, self.range_limit)
    }
}

/// Raw payload of the latest deployment matching all four coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Raw {
    pub workload: String,
    pub platform: String,
    pub environment: String,
    pub version: String,
}

/// Raw payload of one deployment by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawById {
    pub versions_id: i64,
}

/// Any catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRequest {
    Create(CreateDeployment),
    ReadEnvironment(ReadEnvironment),
    ReadPlatform(ReadPlatform),
    ReadHome,
    ReadDistinctWorkloads,
    Raw(Raw),
    RawById(RawById),
}

impl QueryRequest {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::ReadEnvironment(_) => Operation::ReadEnvironment,
            Self::ReadPlatform(_) => Operation::ReadPlatform,
            Self::ReadHome => Operation::ReadHome,
            Self::ReadDistinctWorkloads => Operation::ReadDistinctWorkloads,
            Self::Raw(_) => Operation::Raw,
            Self::RawById(_) => Operation::RawById,
        }
    }

    /// Pagination window for the paginated reads.
    #[must_use]
    pub const fn window(&self) -> Option<PaginationWindow> {
        match self {
            Self::ReadEnvironment(request) => Some(request.window()),
            Self::ReadPlatform(request) => Some(request.window()),
            _ => None,
        }
    }
}
