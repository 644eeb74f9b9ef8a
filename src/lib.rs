//! Deployment version catalog API.
//!
//! Records which version of which workload was deployed where, and serves
//! listings of that history from `PostgreSQL` or `MySQL` through a cache-aside
//! layer (Redis or in-process).

pub mod api;
pub mod domain;
pub mod infrastructure;
