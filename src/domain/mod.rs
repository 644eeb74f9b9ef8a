//! Domain module for the deployment catalog.
//!
//! This module contains the request types, result rows and the pagination
//! calculator. It has no I/O.

pub mod deployment;
pub mod pagination;
pub mod request;

pub use deployment::{
    DeploymentRow, DeploymentStatus, RawRecord, ResultSet, WorkloadRow, raw_payload_value,
};
pub use pagination::{DEFAULT_WINDOW_LIMIT, PaginationWindow};
pub use request::{
    CreateDeployment, Operation, QueryRequest, Raw, RawById, ReadEnvironment, ReadPlatform,
};
