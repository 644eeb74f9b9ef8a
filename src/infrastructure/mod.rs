//! Infrastructure module for external services.
//!
//! This module contains the SQL gateways, cache stores, cache key
//! derivation and the cache-aside layer tying them together.

pub mod cache;
pub mod cache_key;
pub mod cache_store;
pub mod factory;
pub mod gateway;
pub mod in_memory;
pub mod invalidator;
pub mod mysql;
pub mod postgres;
mod records;
pub mod redis_store;

pub use cache::{
    CacheResult, CacheStatus, CachedCatalog, QueryOutcome, ReadOutcome, ServiceError,
    WriteOutcome,
};
pub use cache_key::{
    CATALOG_PREFIX, CacheKey, KeyFamily, KeyedRequest, distinct_workloads_key, home_key,
};
pub use cache_store::{CACHE_ENTRY_TTL, CacheError, CacheFuture, CacheStore, DisabledCacheStore};
pub use factory::{
    CacheMode, CatalogFactory, ConfigurationError, FactoryError, ServiceConfig,
    ServiceConfigBuilder, SqlDriver,
};
pub use gateway::{BackendGateway, GatewayError, GatewayFuture};
pub use in_memory::InMemoryCacheStore;
pub use invalidator::Invalidator;
pub use mysql::MysqlGateway;
pub use postgres::PostgresGateway;
pub use records::HOME_DEPLOYMENT_LIMIT;
pub use redis_store::{DEFAULT_COMMAND_TIMEOUT, RedisCacheStore};
