//! Store factory for startup-time backend selection

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::CacheError;
use crate::domain::cache::{BackendKind, CacheStore};

use super::in_memory::{InMemoryCache, InMemoryCacheConfig, LocalTtlMode};
use super::redis::{RedisCache, RedisCacheConfig};

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Longest accepted TTL; moka refuses anything past 1000 years
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cache configuration, read once at startup
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Which store backs the cache
    pub backend: BackendKind,
    /// Redis URL (used by the durable backend)
    pub redis_url: String,
    /// TTL applied to every entry
    pub ttl: Duration,
    /// Key prefix for namespacing (durable backend)
    pub key_prefix: Option<String>,
    /// TTL handling of the local backend
    pub local_ttl_mode: LocalTtlMode,
    /// Maximum capacity of the local backend; unbounded when `None`
    pub max_capacity: Option<u64>,
    /// Per-operation timeout (durable backend)
    pub operation_timeout: Duration,
    /// De-duplicate concurrent misses for the same key
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            ttl: DEFAULT_TTL,
            key_prefix: None,
            local_ttl_mode: LocalTtlMode::Enforced,
            max_capacity: Some(10_000),
            operation_timeout: Duration::from_secs(5),
            single_flight: false,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration for the local backend
    pub fn local() -> Self {
        Self::default()
    }

    /// Creates a configuration for the durable backend
    pub fn durable(url: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Durable,
            redis_url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the local TTL mode
    pub fn with_local_ttl_mode(mut self, mode: LocalTtlMode) -> Self {
        self.local_ttl_mode = mode;
        self
    }

    /// Enables single-flight de-duplication
    pub fn with_single_flight(mut self) -> Self {
        self.single_flight = true;
        self
    }

    /// Creates config from environment variables
    pub fn from_env() -> Result<Self, CacheError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CacheError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let use_redis = match lookup("USE_REDIS_CACHE") {
            Some(value) => parse_flag("USE_REDIS_CACHE", &value)?,
            None => false,
        };

        let redis_url = lookup("REDIS_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.redis_url);

        let ttl = match lookup("CACHE_TTL_SECS") {
            Some(value) => Duration::from_secs(parse_number::<u64>("CACHE_TTL_SECS", &value)?),
            None => defaults.ttl,
        };

        let key_prefix = lookup("CACHE_KEY_PREFIX").filter(|v| !v.trim().is_empty());

        let local_ttl_mode = match lookup("CACHE_LOCAL_TTL_MODE") {
            Some(value) => value.parse()?,
            None => defaults.local_ttl_mode,
        };

        let max_capacity = match lookup("CACHE_MAX_CAPACITY") {
            Some(value) => match parse_number::<u64>("CACHE_MAX_CAPACITY", &value)? {
                0 => None,
                capacity => Some(capacity),
            },
            None => defaults.max_capacity,
        };

        let operation_timeout = match lookup("CACHE_OPERATION_TIMEOUT_MS") {
            Some(value) => Duration::from_millis(parse_number::<u64>(
                "CACHE_OPERATION_TIMEOUT_MS",
                &value,
            )?),
            None => defaults.operation_timeout,
        };

        let single_flight = match lookup("CACHE_SINGLE_FLIGHT") {
            Some(value) => parse_flag("CACHE_SINGLE_FLIGHT", &value)?,
            None => false,
        };

        let config = Self {
            backend: BackendKind::from_flag(use_redis),
            redis_url,
            ttl,
            key_prefix,
            local_ttl_mode,
            max_capacity,
            operation_timeout,
            single_flight,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the values no store can honor
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.ttl.is_zero() {
            return Err(CacheError::configuration("Cache TTL must be greater than zero"));
        }

        if self.ttl > MAX_TTL {
            return Err(CacheError::configuration(format!(
                "Cache TTL of {}s exceeds the maximum of {}s",
                self.ttl.as_secs(),
                MAX_TTL.as_secs()
            )));
        }

        if self.operation_timeout.is_zero() {
            return Err(CacheError::configuration(
                "Cache operation timeout must be greater than zero",
            ));
        }

        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, CacheError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(CacheError::configuration(format!(
            "Invalid boolean for {}: {}",
            name, value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, CacheError> {
    value
        .trim()
        .parse()
        .map_err(|_| CacheError::configuration(format!("Invalid number for {}: {}", name, value)))
}

/// Factory for creating store instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a new cache factory
    pub fn new() -> Self {
        Self
    }

    /// Creates the store selected by the configuration
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
        config.validate()?;

        match config.backend {
            BackendKind::Local => {
                let mut local_config = InMemoryCacheConfig::default()
                    .with_ttl(config.ttl)
                    .with_ttl_mode(config.local_ttl_mode);

                local_config = match config.max_capacity {
                    Some(capacity) => local_config.with_max_capacity(capacity),
                    None => local_config.unbounded(),
                };

                info!(
                    backend = %config.backend,
                    ttl_secs = config.ttl.as_secs(),
                    ttl_mode = %config.local_ttl_mode,
                    max_capacity = ?config.max_capacity,
                    "Using in-memory cache"
                );

                Ok(Arc::new(InMemoryCache::with_config(local_config)))
            }
            BackendKind::Durable => {
                let mut redis_config = RedisCacheConfig::new(config.redis_url.clone())
                    .with_ttl(config.ttl)
                    .with_operation_timeout(config.operation_timeout);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                let store = RedisCache::new(redis_config).await?;

                info!(
                    backend = %config.backend,
                    ttl_secs = config.ttl.as_secs(),
                    key_prefix = ?config.key_prefix,
                    "Using Redis cache"
                );

                Ok(Arc::new(store))
            }
        }
    }
}
