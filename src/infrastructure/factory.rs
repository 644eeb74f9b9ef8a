//! Catalog factory for startup-time backend and cache selection.
//!
//! The SQL engine and the cache store are chosen once from configuration and
//! fixed for the life of the process.
//!
//! # Environment Variables
//!
//! - `SQL_DRIVER`: `postgres` (default) | `mysql`
//! - `DATABASE_URL`: connection URL for the selected engine (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
//! - `DATABASE_ACQUIRE_TIMEOUT_SECS`: pool checkout deadline (default: 5)
//! - `CACHE_MODE`: `disabled` (default) | `in_memory` | `redis`
//! - `REDIS_URL`: Redis connection URL (required when `CACHE_MODE=redis`)
//! - `HOST`: listen address (default: `0.0.0.0`)
//! - `PORT`: listen port (default: `8080`)
//!
//! # Example
//!
//! ```ignore
//! let config = ServiceConfig::from_env()?;
//! let catalog = CatalogFactory::new(config).create().await?;
//! let home = catalog.read_home().await?;
//! ```

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use super::{
    BackendGateway, CacheStore, CachedCatalog, DEFAULT_COMMAND_TIMEOUT, DisabledCacheStore,
    InMemoryCacheStore, MysqlGateway, PostgresGateway, RedisCacheStore,
};

/// Default pool size for either SQL engine.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default pool checkout deadline.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

pub const DEFAULT_PORT: u16 = 8080;

// =============================================================================
// Configuration Types
// =============================================================================

/// SQL engine backing the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDriver {
    #[default]
    Postgres,
    Mysql,
}

impl FromStr for SqlDriver {
    type Err = ConfigurationError;

    /// Parses a driver name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSqlDriver` if the string is not recognized.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            _ => Err(ConfigurationError::InvalidSqlDriver(value.to_string())),
        }
    }
}

impl std::fmt::Display for SqlDriver {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(formatter, "postgres"),
            Self::Mysql => write!(formatter, "mysql"),
        }
    }
}

/// Cache store in front of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// No caching; every read goes to the backend.
    #[default]
    Disabled,
    /// Process-local store.
    InMemory,
    /// Shared Redis store.
    Redis,
}

impl FromStr for CacheMode {
    type Err = ConfigurationError;

    /// Parses a cache mode from a string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidCacheMode` if the string is not recognized.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigurationError::InvalidCacheMode(value.to_string())),
        }
    }
}

/// Immutable process configuration for the catalog.
///
/// Use `ServiceConfigBuilder` for a fluent API to construct this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub sql_driver: SqlDriver,
    /// Connection URL for the selected engine.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub cache_mode: CacheMode,
    /// Redis connection URL (required when `cache_mode` is `Redis`).
    pub redis_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sql_driver: SqlDriver::default(),
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            cache_mode: CacheMode::default(),
            redis_url: None,
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
        }
    }
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Socket address the HTTP server binds to.
    #[must_use]
    pub const fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Creates a configuration from environment variables.
    ///
    /// Call once at startup; the result is shared read-only afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a value is invalid or a required URL is missing.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| env::var(name))
    }

    /// Creates a configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a value is invalid or a required URL is missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let sql_driver = match lookup("SQL_DRIVER") {
            Ok(value) => value.parse()?,
            Err(env::VarError::NotPresent) => SqlDriver::default(),
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigurationError::InvalidSqlDriver(
                    "<non-UTF-8 value>".to_string(),
                ));
            }
        };

        let cache_mode = match lookup("CACHE_MODE") {
            Ok(value) => value.parse()?,
            Err(env::VarError::NotPresent) => CacheMode::default(),
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigurationError::InvalidCacheMode(
                    "<non-UTF-8 value>".to_string(),
                ));
            }
        };

        let max_connections = parse_number(&lookup, "DATABASE_MAX_CONNECTIONS")?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let acquire_timeout = parse_number::<u64, _>(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS")?
            .map_or(DEFAULT_ACQUIRE_TIMEOUT, Duration::from_secs);

        let host = match lookup("HOST") {
            Ok(value) if value.trim().is_empty() => DEFAULT_HOST,
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigurationError::InvalidHost(value))?,
            Err(env::VarError::NotPresent) => DEFAULT_HOST,
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigurationError::InvalidHost(
                    "<non-UTF-8 value>".to_string(),
                ));
            }
        };
        let port = parse_number(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);

        // Empty or whitespace-only URLs count as missing
        let database_url = lookup("DATABASE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let redis_url = lookup("REDIS_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let config = Self {
            sql_driver,
            database_url,
            max_connections,
            acquire_timeout,
            cache_mode,
            redis_url,
            host,
            port,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if required values are missing or out of range.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.database_url.is_none() {
            return Err(ConfigurationError::MissingDatabaseUrl);
        }

        if self.max_connections == 0 {
            return Err(ConfigurationError::InvalidNumber {
                name: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.cache_mode == CacheMode::Redis && self.redis_url.is_none() {
            return Err(ConfigurationError::MissingRedisUrl);
        }

        Ok(())
    }
}

fn parse_number<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigurationError::InvalidNumber { name, value }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigurationError::InvalidNumber {
            name,
            value: "<non-UTF-8 value>".to_string(),
        }),
    }
}

/// Builder for `ServiceConfig`.
///
/// # Example
///
/// ```ignore
/// let config = ServiceConfig::builder()
///     .sql_driver(SqlDriver::Mysql)
///     .database_url("mysql://localhost/versions")
///     .cache_mode(CacheMode::Redis)
///     .redis_url("redis://localhost:6379")
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub const fn sql_driver(mut self, driver: SqlDriver) -> Self {
        self.config.sql_driver = driver;
        self
    }

    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    #[must_use]
    pub const fn max_connections(mut self, max_connections: u32) -> Self {
        self.config.max_connections = max_connections;
        self
    }

    #[must_use]
    pub const fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.config.cache_mode = mode;
        self
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = Some(url.into());
        self
    }

    #[must_use]
    pub const fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the configuration is invalid.
    pub fn build(self) -> Result<ServiceConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Invalid or incomplete configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid SQL driver: '{0}'. Expected 'postgres' or 'mysql'")]
    InvalidSqlDriver(String),

    #[error("Invalid cache mode: '{0}'. Expected 'disabled', 'in_memory' or 'redis'")]
    InvalidCacheMode(String),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Invalid HOST: '{0}'. Expected an IP address")]
    InvalidHost(String),

    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("REDIS_URL environment variable is required when CACHE_MODE=redis")]
    MissingRedisUrl,
}

/// Errors that can occur during factory initialization.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    #[error("Redis connection error: {0}")]
    RedisConnection(String),
}

// =============================================================================
// Catalog Factory
// =============================================================================

/// Builds the catalog from configuration.
#[derive(Debug, Clone)]
pub struct CatalogFactory {
    config: ServiceConfig,
}

impl CatalogFactory {
    #[must_use]
    pub const fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Creates a factory from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError::Configuration` if environment configuration is invalid.
    pub fn from_env() -> Result<Self, FactoryError> {
        let config = ServiceConfig::from_env()?;
        Ok(Self::new(config))
    }

    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Connects the selected engine and cache store.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError` if the database cannot be reached or the Redis
    /// URL is unusable. A Redis server that is down is not an error here; the
    /// catalog fails open at request time.
    pub async fn create(&self) -> Result<CachedCatalog, FactoryError> {
        let gateway = self.create_gateway().await?;
        let store = self.create_cache_store()?;
        Ok(CachedCatalog::new(gateway, store))
    }

    async fn create_gateway(&self) -> Result<Arc<dyn BackendGateway>, FactoryError> {
        let database_url = self
            .config
            .database_url
            .as_deref()
            .ok_or(ConfigurationError::MissingDatabaseUrl)?;

        match self.config.sql_driver {
            SqlDriver::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(self.config.max_connections)
                    .acquire_timeout(self.config.acquire_timeout)
                    .connect(database_url)
                    .await
                    .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))?;
                Ok(Arc::new(PostgresGateway::new(pool)))
            }
            SqlDriver::Mysql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(self.config.max_connections)
                    .acquire_timeout(self.config.acquire_timeout)
                    .connect(database_url)
                    .await
                    .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))?;
                Ok(Arc::new(MysqlGateway::new(pool)))
            }
        }
    }

    fn create_cache_store(&self) -> Result<Arc<dyn CacheStore>, FactoryError> {
        match self.config.cache_mode {
            CacheMode::Disabled => Ok(Arc::new(DisabledCacheStore)),
            CacheMode::InMemory => Ok(Arc::new(InMemoryCacheStore::new())),
            CacheMode::Redis => {
                let redis_url = self
                    .config
                    .redis_url
                    .as_deref()
                    .ok_or(ConfigurationError::MissingRedisUrl)?;
                let store = RedisCacheStore::from_url(redis_url, DEFAULT_COMMAND_TIMEOUT)
                    .map_err(|error| FactoryError::RedisConnection(error.to_string()))?;
                Ok(Arc::new(store))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
