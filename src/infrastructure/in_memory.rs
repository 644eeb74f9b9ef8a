//! In-memory cache store.
//!
//! Thread-safe with `Arc<RwLock<...>>`. Suitable for single-node deployments
//! and tests; entries expire lazily when read or swept.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::infrastructure::{CACHE_ENTRY_TTL, CacheFuture, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory implementation of `CacheStore`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        keys
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, key: &str) -> CacheFuture<Option<Vec<u8>>> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();

        Box::pin(async move {
            let now = Instant::now();
            let guard = entries.read().await;
            Ok(guard
                .get(&key)
                .filter(|entry| entry.is_live(now))
                .map(|entry| entry.payload.clone()))
        })
    }

    fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> CacheFuture<()> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();

        Box::pin(async move {
            let now = Instant::now();
            let expires_at = now
                .checked_add(ttl)
                .unwrap_or_else(|| now + CACHE_ENTRY_TTL);
            let mut guard = entries.write().await;
            // Drop expired entries while holding the lock anyway.
            guard.retain(|_, entry| entry.is_live(now));
            guard.insert(key, Entry { payload, expires_at });
            Ok(())
        })
    }

    fn delete_by_prefix(&self, prefixes: &[&str]) -> CacheFuture<u64> {
        let entries = Arc::clone(&self.entries);
        let prefixes: Vec<String> = prefixes.iter().map(|prefix| (*prefix).to_string()).collect();

        Box::pin(async move {
            let now = Instant::now();
            let mut guard = entries.write().await;
            let before = guard.len();
            let mut expired = 0usize;
            guard.retain(|key, entry| {
                if prefixes.iter().any(|prefix| key.starts_with(prefix.as_str())) {
                    if !entry.is_live(now) {
                        expired += 1;
                    }
                    return false;
                }
                true
            });
            let removed = before - guard.len() - expired;
            Ok(u64::try_from(removed).unwrap_or(u64::MAX))
        })
    }
}
