//! `MySQL` gateway implementation.
//!
//! Mirrors [`PostgresGateway`](super::PostgresGateway) statement for
//! statement; only the placeholder syntax and DDL differ.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE versions (
//!     versions_id   BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
//!     workload      VARCHAR(255) NOT NULL,
//!     platform      VARCHAR(255) NOT NULL,
//!     environment   VARCHAR(255) NOT NULL,
//!     version       VARCHAR(255) NOT NULL,
//!     changelog_url TEXT,
//!     raw           LONGTEXT,
//!     status        VARCHAR(32) NOT NULL,
//!     date          TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
//!     INDEX idx_versions_lookup (workload, platform, environment, date)
//! ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
//! ```

use sqlx::MySqlPool;

use crate::domain::{
    CreateDeployment, DeploymentRow, Raw, RawById, RawRecord, ReadEnvironment, ReadPlatform,
    WorkloadRow,
};
use crate::infrastructure::records::{
    DEPLOYMENT_COLUMNS, DeploymentRecord, HOME_DEPLOYMENT_LIMIT, into_raw_record, into_rows,
};
use crate::infrastructure::{BackendGateway, GatewayFuture};

/// `MySQL` implementation of `BackendGateway`.
#[derive(Debug, Clone)]
pub struct MysqlGateway {
    /// Connection pool for `MySQL`.
    pool: MySqlPool,
}

impl MysqlGateway {
    #[must_use]
    pub const fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl BackendGateway for MysqlGateway {
    fn engine(&self) -> &'static str {
        "mysql"
    }

    fn create(&self, request: &CreateDeployment) -> GatewayFuture<()> {
        let pool = self.pool.clone();
        let request = request.clone();

        Box::pin(async move {
            sqlx::query(
                "INSERT INTO versions \
                 (workload, platform, environment, version, changelog_url, raw, status) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&request.workload)
            .bind(&request.platform)
            .bind(&request.environment)
            .bind(&request.version)
            .bind(&request.changelog_url)
            .bind(&request.raw)
            .bind(request.status.as_str())
            .execute(&pool)
            .await?;
            Ok(())
        })
    }

    fn read_environment(&self, request: &ReadEnvironment) -> GatewayFuture<Vec<DeploymentRow>> {
        let pool = self.pool.clone();
        let request = request.clone();

        Box::pin(async move {
            let window = request.window();
            let sql = format!(
                "SELECT {DEPLOYMENT_COLUMNS} FROM versions \
                 WHERE workload = ? AND platform = ? AND environment = ? \
                 ORDER BY date DESC, versions_id DESC LIMIT ? OFFSET ?"
            );
            let records: Vec<DeploymentRecord> = sqlx::query_as(&sql)
                .bind(&request.workload)
                .bind(&request.platform)
                .bind(&request.environment)
                .bind(i64::from(window.effective_limit()))
                .bind(i64::try_from(window.offset).unwrap_or(i64::MAX))
                .fetch_all(&pool)
                .await?;
            into_rows(records)
        })
    }

    fn read_platform(&self, request: &ReadPlatform) -> GatewayFuture<Vec<DeploymentRow>> {
        let pool = self.pool.clone();
        let request = request.clone();

        Box::pin(async move {
            let window = request.window();
            let sql = format!(
                "SELECT {DEPLOYMENT_COLUMNS} FROM versions \
                 WHERE workload = ? AND platform = ? \
                 ORDER BY date DESC, versions_id DESC LIMIT ? OFFSET ?"
            );
            let records: Vec<DeploymentRecord> = sqlx::query_as(&sql)
                .bind(&request.workload)
                .bind(&request.platform)
                .bind(i64::from(window.effective_limit()))
                .bind(i64::try_from(window.offset).unwrap_or(i64::MAX))
                .fetch_all(&pool)
                .await?;
            into_rows(records)
        })
    }

    fn read_home(&self) -> GatewayFuture<Vec<DeploymentRow>> {
        let pool = self.pool.clone();

        Box::pin(async move {
            let sql = format!(
                "SELECT {DEPLOYMENT_COLUMNS} FROM versions \
                 ORDER BY date DESC, versions_id DESC LIMIT ?"
            );
            let records: Vec<DeploymentRecord> = sqlx::query_as(&sql)
                .bind(HOME_DEPLOYMENT_LIMIT)
                .fetch_all(&pool)
                .await?;
            into_rows(records)
        })
    }

    fn read_distinct_workloads(&self) -> GatewayFuture<Vec<WorkloadRow>> {
        let pool = self.pool.clone();

        Box::pin(async move {
            let rows: Vec<(String,)> =
                sqlx::query_as("SELECT DISTINCT workload FROM versions ORDER BY workload ASC")
                    .fetch_all(&pool)
                    .await?;
            Ok(rows
                .into_iter()
                .map(|(workload,)| WorkloadRow { workload })
                .collect())
        })
    }

    fn raw(&self, request: &Raw) -> GatewayFuture<RawRecord> {
        let pool = self.pool.clone();
        let request = request.clone();

        Box::pin(async move {
            let sql = format!(
                "SELECT {DEPLOYMENT_COLUMNS} FROM versions \
                 WHERE workload = ? AND platform = ? AND environment = ? AND version = ? \
                 ORDER BY date DESC, versions_id DESC LIMIT 1"
            );
            let record: Option<DeploymentRecord> = sqlx::query_as(&sql)
                .bind(&request.workload)
                .bind(&request.platform)
                .bind(&request.environment)
                .bind(&request.version)
                .fetch_optional(&pool)
                .await?;
            Ok(into_raw_record(record))
        })
    }

    fn raw_by_id(&self, request: &RawById) -> GatewayFuture<RawRecord> {
        let pool = self.pool.clone();
        let versions_id = request.versions_id;

        Box::pin(async move {
            let sql = format!("SELECT {DEPLOYMENT_COLUMNS} FROM versions WHERE versions_id = ?");
            let record: Option<DeploymentRecord> = sqlx::query_as(&sql)
                .bind(versions_id)
                .fetch_optional(&pool)
                .await?;
            Ok(into_raw_record(record))
        })
    }
}
