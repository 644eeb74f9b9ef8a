//! Cache store contract.
//!
//! A cache store is an external key/value service with expiring entries and
//! prefix deletion. Stores may be unreachable at any time; callers treat every
//! [`CacheError`] as a miss (reads) or a no-op (invalidation).

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

/// Fixed lifetime of a cache entry: 30 days.
pub const CACHE_ENTRY_TTL: Duration = Duration::from_secs(86_400 * 30);

/// Errors raised by a cache store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The store could not be reached.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// The store rejected or failed a command.
    #[error("Cache command error: {0}")]
    Command(String),
}

/// Result alias for cache store futures.
pub type CacheFuture<T> = BoxFuture<'static, Result<T, CacheError>>;

/// Key/value store used by the cache-aside layer.
pub trait CacheStore: Send + Sync {
    /// Whether the store holds anything at all. Disabled stores make the
    /// orchestrator skip key derivation and report a bypass.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Reads the payload stored under `key`, `None` when absent or expired.
    fn get(&self, key: &str) -> CacheFuture<Option<Vec<u8>>>;

    /// Stores `payload` under `key`, replacing any previous value.
    fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> CacheFuture<()>;

    /// Deletes every key starting with one of `prefixes` and returns how many
    /// keys were removed.
    fn delete_by_prefix(&self, prefixes: &[&str]) -> CacheFuture<u64>;
}

// =============================================================================
// Disabled Store
// =============================================================================

/// Store used when caching is turned off: holds nothing, accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCacheStore;

impl CacheStore for DisabledCacheStore {
    fn is_enabled(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> CacheFuture<Option<Vec<u8>>> {
        Box::pin(async { Ok(None) })
    }

    fn set(&self, _key: &str, _payload: Vec<u8>, _ttl: Duration) -> CacheFuture<()> {
        Box::pin(async { Ok(()) })
    }

    fn delete_by_prefix(&self, _prefixes: &[&str]) -> CacheFuture<u64> {
        Box::pin(async { Ok(0) })
    }
}
