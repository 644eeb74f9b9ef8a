//! Redis cache store.
//!
//! Uses `deadpool-redis` for connection pooling. Payloads are stored as plain
//! strings with `SET .. EX`; prefix deletion walks the keyspace with a
//! cursor-based `SCAN MATCH` (never `KEYS`) and deletes each batch.
//!
//! Every command runs under a deadline so a stalled Redis surfaces as a
//! [`CacheError`] instead of holding the request.

use std::time::Duration;

use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use crate::infrastructure::{CacheError, CacheFuture, CacheStore};

/// Default deadline for a single Redis round trip.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Keys requested per `SCAN` iteration.
const SCAN_BATCH_SIZE: usize = 500;

/// Redis implementation of `CacheStore`.
#[derive(Clone)]
pub struct RedisCacheStore {
    /// Connection pool for Redis.
    pool: Pool,
    /// Deadline applied to every command, connection checkout included.
    command_timeout: Duration,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RedisCacheStore")
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisCacheStore {
    #[must_use]
    pub const fn new(pool: Pool, command_timeout: Duration) -> Self {
        Self {
            pool,
            command_timeout,
        }
    }

    /// Creates a store from a Redis URL.
    ///
    /// The pool connects lazily, so an unreachable server is not an error here.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the URL cannot be turned into a pool.
    pub fn from_url(redis_url: &str, command_timeout: Duration) -> Result<Self, CacheError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|error| CacheError::Connection(error.to_string()))?;
        Ok(Self::new(pool, command_timeout))
    }
}

/// Escapes glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for character in prefix.chars() {
        if matches!(character, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(character);
    }
    pattern.push('*');
    pattern
}

async fn with_deadline<T, F>(timeout: Duration, operation: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| CacheError::Connection(format!("Redis call exceeded {timeout:?}")))?
}

#[allow(clippy::significant_drop_tightening)]
impl CacheStore for RedisCacheStore {
    fn get(&self, key: &str) -> CacheFuture<Option<Vec<u8>>> {
        let pool = self.pool.clone();
        let timeout = self.command_timeout;
        let key = key.to_string();

        Box::pin(with_deadline(timeout, async move {
            let mut connection = pool
                .get()
                .await
                .map_err(|error| CacheError::Connection(error.to_string()))?;
            let payload: Option<Vec<u8>> = connection
                .get(&key)
                .await
                .map_err(|error| CacheError::Command(error.to_string()))?;
            Ok(payload)
        }))
    }

    fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> CacheFuture<()> {
        let pool = self.pool.clone();
        let timeout = self.command_timeout;
        let key = key.to_string();
        // SET EX rejects zero.
        let seconds = ttl.as_secs().max(1);

        Box::pin(with_deadline(timeout, async move {
            let mut connection = pool
                .get()
                .await
                .map_err(|error| CacheError::Connection(error.to_string()))?;
            let () = connection
                .set_ex(&key, payload, seconds)
                .await
                .map_err(|error| CacheError::Command(error.to_string()))?;
            Ok(())
        }))
    }

    fn delete_by_prefix(&self, prefixes: &[&str]) -> CacheFuture<u64> {
        let pool = self.pool.clone();
        let timeout = self.command_timeout;
        let patterns: Vec<String> = prefixes.iter().map(|prefix| match_pattern(prefix)).collect();

        Box::pin(async move {
            let mut connection = with_deadline(timeout, async {
                pool.get()
                    .await
                    .map_err(|error| CacheError::Connection(error.to_string()))
            })
            .await?;

            let mut removed = 0u64;
            for pattern in &patterns {
                let mut cursor = 0u64;
                loop {
                    let (next_cursor, keys): (u64, Vec<String>) = with_deadline(timeout, async {
                        redis::cmd("SCAN")
                            .arg(cursor)
                            .arg("MATCH")
                            .arg(pattern)
                            .arg("COUNT")
                            .arg(SCAN_BATCH_SIZE)
                            .query_async(&mut *connection)
                            .await
                            .map_err(|error| CacheError::Command(error.to_string()))
                    })
                    .await?;

                    if !keys.is_empty() {
                        let deleted: u64 = with_deadline(timeout, async {
                            connection
                                .del(&keys)
                                .await
                                .map_err(|error| CacheError::Command(error.to_string()))
                        })
                        .await?;
                        removed += deleted;
                    }

                    cursor = next_cursor;
                    if cursor == 0 {
                        break;
                    }
                }
            }

            Ok(removed)
        })
    }
}
