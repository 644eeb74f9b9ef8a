//! Common test helpers for integration tests.
//!
//! Provides an in-memory [`BackendGateway`] that records calls and can be
//! told to fail, plus a cache store with switchable faults.
//!
//! # Note
//!
//! `#![allow(dead_code)]` is needed because every file in `tests/` compiles
//! this module into its own crate and none of them uses every helper.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::Value;

use versions_api::api::AppState;
use versions_api::domain::{
    CreateDeployment, DeploymentRow, DeploymentStatus, Operation, Raw, RawById, RawRecord,
    ReadEnvironment, ReadPlatform, WorkloadRow, raw_payload_value,
};
use versions_api::infrastructure::{
    BackendGateway, CacheError, CacheFuture, CacheStore, CachedCatalog, GatewayError,
    GatewayFuture, HOME_DEPLOYMENT_LIMIT, InMemoryCacheStore,
};

// =============================================================================
// Fixtures
// =============================================================================

/// Builds a deployment row dated `minute` minutes into 2024-05-01.
pub fn deployment(
    versions_id: i64,
    workload: &str,
    platform: &str,
    environment: &str,
    version: &str,
    minute: u32,
) -> DeploymentRow {
    DeploymentRow {
        versions_id,
        workload: workload.to_string(),
        platform: platform.to_string(),
        environment: environment.to_string(),
        version: version.to_string(),
        changelog_url: None,
        status: DeploymentStatus::Deployed,
        date: Utc
            .with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
            .single()
            .unwrap_or_default(),
    }
}

/// Three `billing` deployments on `prod`, newest has the highest id.
pub fn billing_on_prod() -> Vec<DeploymentRow> {
    vec![
        deployment(1, "billing", "prod", "eu-west", "1.0.0", 1),
        deployment(2, "billing", "prod", "us-east", "1.1.0", 2),
        deployment(3, "billing", "prod", "eu-west", "1.2.0", 3),
    ]
}

pub fn create_request(workload: &str, version: &str) -> CreateDeployment {
    CreateDeployment {
        workload: workload.to_string(),
        platform: "prod".to_string(),
        environment: "eu-west".to_string(),
        version: version.to_string(),
        changelog_url: None,
        raw: Some(r#"{"commit":"f00"}"#.to_string()),
        status: DeploymentStatus::Deployed,
    }
}

pub fn catalog(gateway: &RecordingGateway, store: Arc<dyn CacheStore>) -> CachedCatalog {
    CachedCatalog::new(Arc::new(gateway.clone()), store)
}

pub fn app_state(gateway: &RecordingGateway, store: Arc<dyn CacheStore>) -> AppState {
    AppState::new(catalog(gateway, store))
}

// =============================================================================
// Recording Gateway
// =============================================================================

#[derive(Debug, Default)]
struct GatewayState {
    rows: Vec<DeploymentRow>,
    raw_payloads: HashMap<i64, String>,
    calls: HashMap<Operation, usize>,
    delay: Option<Duration>,
}

/// In-memory catalog that counts calls per operation.
#[derive(Debug, Clone, Default)]
pub struct RecordingGateway {
    state: Arc<Mutex<GatewayState>>,
    failing: Arc<AtomicBool>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<DeploymentRow>) -> Self {
        let gateway = Self::new();
        gateway.lock().rows = rows;
        gateway
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a row behind the cache's back, as another writer would.
    pub fn insert(&self, row: DeploymentRow) {
        self.lock().rows.push(row);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every call sleep before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn row_count(&self) -> usize {
        self.lock().rows.len()
    }

    /// Records the call and returns the configured delay, or the injected failure.
    fn enter(&self, operation: Operation) -> Result<Option<Duration>, GatewayError> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Database("injected failure".to_string()));
        }
        Ok(state.delay)
    }

    fn answer<T, F>(&self, operation: Operation, query: F) -> GatewayFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut GatewayState) -> T + Send + 'static,
    {
        let gateway = self.clone();
        Box::pin(async move {
            if let Some(delay) = gateway.enter(operation)? {
                tokio::time::sleep(delay).await;
            }
            let mut state = gateway.lock();
            Ok(query(&mut state))
        })
    }
}

fn newest_first(mut rows: Vec<DeploymentRow>) -> Vec<DeploymentRow> {
    rows.sort_by(|left, right| {
        right
            .date
            .cmp(&left.date)
            .then(right.versions_id.cmp(&left.versions_id))
    });
    rows
}

fn window(rows: Vec<DeploymentRow>, offset: u64, limit: u32) -> Vec<DeploymentRow> {
    rows.into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect()
}

fn raw_record(row: &DeploymentRow, payload: Option<&String>) -> RawRecord {
    let mut record = RawRecord::new();
    record.insert("versions_id", Some(Value::from(row.versions_id)));
    record.insert("workload", Some(Value::String(row.workload.clone())));
    record.insert("platform", Some(Value::String(row.platform.clone())));
    record.insert("environment", Some(Value::String(row.environment.clone())));
    record.insert("version", Some(Value::String(row.version.clone())));
    record.insert("changelog_url", row.changelog_url.clone().map(Value::String));
    record.insert("raw", payload.map(|payload| raw_payload_value(payload)));
    record.insert("status", Some(Value::String(row.status.to_string())));
    record.insert("date", Some(Value::String(row.date.to_rfc3339())));
    record
}

impl BackendGateway for RecordingGateway {
    fn engine(&self) -> &'static str {
        "recording"
    }

    fn create(&self, request: &CreateDeployment) -> GatewayFuture<()> {
        let request = request.clone();
        self.answer(Operation::Create, move |state| {
            let versions_id = state.rows.iter().map(|row| row.versions_id).max().unwrap_or(0) + 1;
            state.rows.push(DeploymentRow {
                versions_id,
                workload: request.workload,
                platform: request.platform,
                environment: request.environment,
                version: request.version,
                changelog_url: request.changelog_url,
                status: request.status,
                date: Utc::now(),
            });
            if let Some(raw) = request.raw {
                state.raw_payloads.insert(versions_id, raw);
            }
        })
    }

    fn read_environment(&self, request: &ReadEnvironment) -> GatewayFuture<Vec<DeploymentRow>> {
        let request = request.clone();
        self.answer(Operation::ReadEnvironment, move |state| {
            let matching = state
                .rows
                .iter()
                .filter(|row| {
                    row.workload == request.workload
                        && row.platform == request.platform
                        && row.environment == request.environment
                })
                .cloned()
                .collect();
            let requested = request.window();
            window(
                newest_first(matching),
                requested.offset,
                requested.effective_limit(),
            )
        })
    }

    fn read_platform(&self, request: &ReadPlatform) -> GatewayFuture<Vec<DeploymentRow>> {
        let request = request.clone();
        self.answer(Operation::ReadPlatform, move |state| {
            let matching = state
                .rows
                .iter()
                .filter(|row| row.workload == request.workload && row.platform == request.platform)
                .cloned()
                .collect();
            let requested = request.window();
            window(
                newest_first(matching),
                requested.offset,
                requested.effective_limit(),
            )
        })
    }

    fn read_home(&self) -> GatewayFuture<Vec<DeploymentRow>> {
        self.answer(Operation::ReadHome, |state| {
            let limit = usize::try_from(HOME_DEPLOYMENT_LIMIT).unwrap_or(usize::MAX);
            newest_first(state.rows.clone()).into_iter().take(limit).collect()
        })
    }

    fn read_distinct_workloads(&self) -> GatewayFuture<Vec<WorkloadRow>> {
        self.answer(Operation::ReadDistinctWorkloads, |state| {
            state
                .rows
                .iter()
                .map(|row| row.workload.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|workload| WorkloadRow { workload })
                .collect()
        })
    }

    fn raw(&self, request: &Raw) -> GatewayFuture<RawRecord> {
        let request = request.clone();
        self.answer(Operation::Raw, move |state| {
            let matching: Vec<DeploymentRow> = state
                .rows
                .iter()
                .filter(|row| {
                    row.workload == request.workload
                        && row.platform == request.platform
                        && row.environment == request.environment
                        && row.version == request.version
                })
                .cloned()
                .collect();
            newest_first(matching).first().map_or_else(RawRecord::new, |row| {
                raw_record(row, state.raw_payloads.get(&row.versions_id))
            })
        })
    }

    fn raw_by_id(&self, request: &RawById) -> GatewayFuture<RawRecord> {
        let versions_id = request.versions_id;
        self.answer(Operation::RawById, move |state| {
            state
                .rows
                .iter()
                .find(|row| row.versions_id == versions_id)
                .map_or_else(RawRecord::new, |row| {
                    raw_record(row, state.raw_payloads.get(&row.versions_id))
                })
        })
    }
}

// =============================================================================
// Faulty Cache Store
// =============================================================================

/// In-memory store whose operations can be switched to fail individually.
#[derive(Debug, Clone, Default)]
pub struct FaultyCacheStore {
    pub inner: InMemoryCacheStore,
    fail_get: Arc<AtomicBool>,
    fail_set: Arc<AtomicBool>,
    fail_delete: Arc<AtomicBool>,
}

impl FaultyCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that is entirely unreachable.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.fail_get.store(true, Ordering::SeqCst);
        store.fail_set.store(true, Ordering::SeqCst);
        store.fail_delete.store(true, Ordering::SeqCst);
        store
    }

    pub fn fail_get(&self, failing: bool) {
        self.fail_get.store(failing, Ordering::SeqCst);
    }

    pub fn fail_set(&self, failing: bool) {
        self.fail_set.store(failing, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, failing: bool) {
        self.fail_delete.store(failing, Ordering::SeqCst);
    }
}

fn refused<T: Send + 'static>() -> CacheFuture<T> {
    Box::pin(async { Err(CacheError::Connection("connection refused".to_string())) })
}

impl CacheStore for FaultyCacheStore {
    fn get(&self, key: &str) -> CacheFuture<Option<Vec<u8>>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return refused();
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> CacheFuture<()> {
        if self.fail_set.load(Ordering::SeqCst) {
            return refused();
        }
        self.inner.set(key, payload, ttl)
    }

    fn delete_by_prefix(&self, prefixes: &[&str]) -> CacheFuture<u64> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return refused();
        }
        self.inner.delete_by_prefix(prefixes)
    }
}
