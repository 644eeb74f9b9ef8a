//! Cache-aside layer over the backend gateway.
//!
//! [`CachedCatalog`] is the single read/write entry point used by the API. It
//! wraps one [`BackendGateway`] and one [`CacheStore`], both fixed at startup.
//!
//! # Read Path
//!
//! 1. Derive the cache key from the request.
//! 2. `GET` the key. A store failure is logged and handled as a miss
//!    (fail-open, reported as [`CacheStatus::Error`]). The write in step 4
//!    is still attempted.
//! 3. On hit, decode the payload. An undecodable payload is a
//!    [`ServiceError::CorruptCacheEntry`], not a miss.
//! 4. On miss, query the gateway. Backend failures are returned and nothing is
//!    cached. Empty results are returned as [`ReadOutcome::Empty`] and never
//!    cached. Non-empty results are stored with [`CACHE_ENTRY_TTL`]; a failed
//!    store write is logged only.
//!
//! A disabled store short-circuits to the gateway ([`CacheStatus::Bypass`]).
//!
//! # Write Path
//!
//! `create` commits through the gateway, then sweeps the catalog key families
//! with the [`Invalidator`].
//!
//! The cache write of a read runs inside the request future, so a cancelled
//! read never leaves a write behind. Concurrent misses on one key are not
//! coalesced; each queries the backend and overwrites the entry.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::{
    CreateDeployment, DeploymentRow, Operation, QueryRequest, Raw, RawById, RawRecord,
    ReadEnvironment, ReadPlatform, ResultSet, WorkloadRow,
};
use crate::infrastructure::{
    BackendGateway, CACHE_ENTRY_TTL, CacheKey, CacheStore, GatewayError, GatewayFuture,
    Invalidator, KeyedRequest, distinct_workloads_key, home_key,
};

// =============================================================================
// Service Error
// =============================================================================

/// Failures that reach the caller.
///
/// Cache store outages never appear here; they are absorbed by the layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The storage engine failed.
    #[error(transparent)]
    Backend(#[from] GatewayError),

    /// A cached payload could not be decoded.
    #[error("Corrupt cache entry at {key}: {message}")]
    CorruptCacheEntry { key: String, message: String },

    /// A result could not be encoded for the cache.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// Cache Result Types
// =============================================================================

/// Cache status for observability (used in X-Cache header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Value was found in cache.
    Hit,
    /// Value was not found in cache (fetched from the backend).
    Miss,
    /// Cache was bypassed (disabled store or write operation).
    Bypass,
    /// Cache lookup failed; the value was fetched from the backend.
    Error,
}

impl CacheStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Result of a cached operation containing both the value and cache status.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheResult<T> {
    /// The retrieved value.
    pub value: T,
    /// The status of the cache operation.
    pub cache_status: CacheStatus,
}

impl<T> CacheResult<T> {
    #[must_use]
    pub const fn new(value: T, cache_status: CacheStatus) -> Self {
        Self {
            value,
            cache_status,
        }
    }

    #[must_use]
    pub const fn hit(value: T) -> Self {
        Self::new(value, CacheStatus::Hit)
    }

    #[must_use]
    pub const fn miss(value: T) -> Self {
        Self::new(value, CacheStatus::Miss)
    }

    #[must_use]
    pub const fn bypass(value: T) -> Self {
        Self::new(value, CacheStatus::Bypass)
    }

    pub fn map<U, F>(self, function: F) -> CacheResult<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheResult::new(function(self.value), self.cache_status)
    }
}

/// Outcome of a read: rows found, or nothing matched.
///
/// The API decides whether `Empty` means "not found" or "no content".
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Found(T),
    Empty,
}

impl<T: ResultSet> ReadOutcome<T> {
    /// Classifies a backend result.
    pub fn from_result(value: T) -> Self {
        if value.is_empty_result() {
            Self::Empty
        } else {
            Self::Found(value)
        }
    }
}

impl<T> ReadOutcome<T> {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Empty => None,
        }
    }
}

/// Outcome of a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Keys removed by the invalidation sweep, `None` if the sweep failed.
    pub invalidated: Option<u64>,
}

/// Outcome of [`CachedCatalog::execute`], tagged by result shape.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Created(WriteOutcome),
    Deployments(ReadOutcome<Vec<DeploymentRow>>),
    Workloads(ReadOutcome<Vec<WorkloadRow>>),
    Record(ReadOutcome<RawRecord>),
}

// =============================================================================
// Cached Catalog
// =============================================================================

/// Cache-aside front of the deployment catalog.
#[derive(Clone)]
pub struct CachedCatalog {
    gateway: Arc<dyn BackendGateway>,
    store: Arc<dyn CacheStore>,
    invalidator: Invalidator,
    ttl: Duration,
}

impl std::fmt::Debug for CachedCatalog {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CachedCatalog")
            .field("engine", &self.gateway.engine())
            .field("cache_enabled", &self.store.is_enabled())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CachedCatalog {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>, store: Arc<dyn CacheStore>) -> Self {
        let invalidator = Invalidator::new(Arc::clone(&store));
        Self {
            gateway,
            store,
            invalidator,
            ttl: CACHE_ENTRY_TTL,
        }
    }

    /// Engine name of the wrapped gateway.
    #[must_use]
    pub fn engine(&self) -> &'static str {
        self.gateway.engine()
    }

    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Deployments of one environment.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` on backend failure or a corrupt cache entry.
    pub async fn read_environment(
        &self,
        request: &ReadEnvironment,
    ) -> Result<CacheResult<ReadOutcome<Vec<DeploymentRow>>>, ServiceError> {
        self.read_through(
            Operation::ReadEnvironment,
            || request.cache_key(),
            || self.gateway.read_environment(request),
        )
        .await
    }

    /// Deployments across a platform.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` on backend failure or a corrupt cache entry.
    pub async fn read_platform(
        &self,
        request: &ReadPlatform,
    ) -> Result<CacheResult<ReadOutcome<Vec<DeploymentRow>>>, ServiceError> {
        self.read_through(
            Operation::ReadPlatform,
            || request.cache_key(),
            || self.gateway.read_platform(request),
        )
        .await
    }

    /// Latest deployments across the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` on backend failure or a corrupt cache entry.
    pub async fn read_home(
        &self,
    ) -> Result<CacheResult<ReadOutcome<Vec<DeploymentRow>>>, ServiceError> {
        self.read_through(Operation::ReadHome, home_key, || self.gateway.read_home())
            .await
    }

    /// Every workload name once.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` on backend failure or a corrupt cache entry.
    pub async fn read_distinct_workloads(
        &self,
    ) -> Result<CacheResult<ReadOutcome<Vec<WorkloadRow>>>, ServiceError> {
        self.read_through(
            Operation::ReadDistinctWorkloads,
            distinct_workloads_key,
            || self.gateway.read_distinct_workloads(),
        )
        .await
    }

    /// Latest deployment matching all four coordinates.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` on backend failure or a corrupt cache entry.
    pub async fn raw(
        &self,
        request: &Raw,
    ) -> Result<CacheResult<ReadOutcome<RawRecord>>, ServiceError> {
        self.read_through(
            Operation::Raw,
            || request.cache_key(),
            || self.gateway.raw(request),
        )
        .await
    }

    /// Deployment by identifier.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` on backend failure or a corrupt cache entry.
    pub async fn raw_by_id(
        &self,
        request: &RawById,
    ) -> Result<CacheResult<ReadOutcome<RawRecord>>, ServiceError> {
        self.read_through(
            Operation::RawById,
            || request.cache_key(),
            || self.gateway.raw_by_id(request),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Records a deployment, then invalidates the catalog key families.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Backend` if the insert fails; nothing is
    /// invalidated in that case. Invalidation failures are not errors.
    pub async fn create(&self, request: &CreateDeployment) -> Result<WriteOutcome, ServiceError> {
        self.gateway
            .create(request)
            .await
            .map_err(|error| backend_failure(Operation::Create, error))?;

        let invalidated = self.invalidator.sweep().await;
        Ok(WriteOutcome { invalidated })
    }

    /// Runs any request variant.
    ///
    /// Writes report [`CacheStatus::Bypass`].
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` as the typed operation would.
    pub async fn execute(
        &self,
        request: &QueryRequest,
    ) -> Result<CacheResult<QueryOutcome>, ServiceError> {
        tracing::debug!(operation = %request.operation(), "Executing request");
        match request {
            QueryRequest::Create(create) => {
                let outcome = self.create(create).await?;
                Ok(CacheResult::bypass(QueryOutcome::Created(outcome)))
            }
            QueryRequest::ReadEnvironment(read) => Ok(self
                .read_environment(read)
                .await?
                .map(QueryOutcome::Deployments)),
            QueryRequest::ReadPlatform(read) => Ok(self
                .read_platform(read)
                .await?
                .map(QueryOutcome::Deployments)),
            QueryRequest::ReadHome => Ok(self.read_home().await?.map(QueryOutcome::Deployments)),
            QueryRequest::ReadDistinctWorkloads => Ok(self
                .read_distinct_workloads()
                .await?
                .map(QueryOutcome::Workloads)),
            QueryRequest::Raw(read) => Ok(self.raw(read).await?.map(QueryOutcome::Record)),
            QueryRequest::RawById(read) => {
                Ok(self.raw_by_id(read).await?.map(QueryOutcome::Record))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Cache-aside
    // -------------------------------------------------------------------------

    async fn read_through<T, K, L>(
        &self,
        operation: Operation,
        derive_key: K,
        load: L,
    ) -> Result<CacheResult<ReadOutcome<T>>, ServiceError>
    where
        T: ResultSet + Serialize + DeserializeOwned,
        K: FnOnce() -> CacheKey,
        L: FnOnce() -> GatewayFuture<T>,
    {
        if !self.store.is_enabled() {
            let value = load()
                .await
                .map_err(|error| backend_failure(operation, error))?;
            return Ok(CacheResult::bypass(ReadOutcome::from_result(value)));
        }

        let key = derive_key();

        let cache_status = match self.store.get(key.as_str()).await {
            Ok(Some(payload)) => {
                let value = decode_entry::<T>(&key, &payload)?;
                tracing::debug!(operation = %operation, key = %key, "Cache hit");
                return Ok(CacheResult::hit(ReadOutcome::from_result(value)));
            }
            Ok(None) => {
                tracing::debug!(operation = %operation, key = %key, "Cache miss");
                CacheStatus::Miss
            }
            Err(error) => {
                tracing::warn!(
                    operation = %operation,
                    key = %key,
                    error = %error,
                    "Cache GET failed, falling back to backend"
                );
                CacheStatus::Error
            }
        };

        let value = load()
            .await
            .map_err(|error| backend_failure(operation, error))?;

        if value.is_empty_result() {
            tracing::debug!(operation = %operation, key = %key, "Empty result, not cached");
            return Ok(CacheResult::new(ReadOutcome::Empty, cache_status));
        }

        // A failed GET still attempts the write; a failed SET is absorbed.
        let payload = serde_json::to_vec(&value).map_err(|error| {
            tracing::error!(operation = %operation, error = %error, "Failed to encode result");
            ServiceError::Serialization(error.to_string())
        })?;

        if let Err(error) = self.store.set(key.as_str(), payload, self.ttl).await {
            tracing::warn!(
                operation = %operation,
                key = %key,
                error = %error,
                "Failed to populate cache after backend read"
            );
        }

        Ok(CacheResult::new(ReadOutcome::Found(value), cache_status))
    }
}

fn decode_entry<T: DeserializeOwned>(key: &CacheKey, payload: &[u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(payload).map_err(|error| {
        tracing::error!(key = %key, error = %error, "Corrupt cache entry");
        ServiceError::CorruptCacheEntry {
            key: key.to_string(),
            message: error.to_string(),
        }
    })
}

fn backend_failure(operation: Operation, error: GatewayError) -> ServiceError {
    tracing::error!(operation = %operation, error = %error, "Backend operation failed");
    ServiceError::Backend(error)
}

// =============================================================================
// Tests
// =============================================================================
