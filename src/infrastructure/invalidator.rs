//! Write-path cache invalidation.
//!
//! After a committed write, every key in the affected families is deleted by
//! prefix. The sweep is coarse: it never computes which keys a row touches.

use std::sync::Arc;

use crate::infrastructure::{CacheStore, KeyFamily};

/// Deletes whole key families from a cache store.
#[derive(Clone)]
pub struct Invalidator {
    store: Arc<dyn CacheStore>,
    families: &'static [KeyFamily],
}

impl std::fmt::Debug for Invalidator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Invalidator")
            .field("families", &self.families)
            .finish_non_exhaustive()
    }
}

impl Invalidator {
    /// Invalidator for the catalog write path (both read families).
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::for_families(store, &KeyFamily::CATALOG)
    }

    #[must_use]
    pub fn for_families(store: Arc<dyn CacheStore>, families: &'static [KeyFamily]) -> Self {
        Self { store, families }
    }

    #[must_use]
    pub const fn families(&self) -> &'static [KeyFamily] {
        self.families
    }

    /// Sweeps every configured family.
    ///
    /// Runs on its own task so the sweep finishes even if the caller is
    /// dropped after the write committed. Failures are logged and reported as
    /// `None`; they never fail the write.
    pub async fn sweep(&self) -> Option<u64> {
        let prefixes: Vec<&'static str> = self.families.iter().map(|family| family.prefix()).collect();
        let sweep = tokio::spawn(self.store.delete_by_prefix(&prefixes));

        match sweep.await {
            Ok(Ok(removed)) => {
                tracing::debug!(prefixes = ?prefixes, removed, "Cache families invalidated");
                Some(removed)
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    prefixes = ?prefixes,
                    error = %error,
                    "Cache invalidation failed, stale entries remain until expiry"
                );
                None
            }
            Err(error) => {
                tracing::warn!(
                    prefixes = ?prefixes,
                    error = %error,
                    "Cache invalidation task aborted"
                );
                None
            }
        }
    }
}
