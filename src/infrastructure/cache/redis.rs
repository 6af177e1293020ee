//! Redis store implementation

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use tracing::debug;

use crate::domain::CacheError;
use crate::domain::cache::{BackendKind, CacheKey, CacheStore};

const BACKEND: &str = "redis";

/// Configuration for Redis store
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379/0")
    pub url: String,
    /// TTL pushed down to Redis on every write
    pub ttl: Duration,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Timeout for establishing the initial connection
    pub connection_timeout: Duration,
    /// Timeout for each GET/SET/DEL round-trip
    pub operation_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            ttl: Duration::from_secs(3600),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisCacheConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
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

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the per-operation timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// Redis-backed durable store
///
/// Entries are written with `SET .. PX`, so expiry is enforced by Redis
/// itself. Expired and never-set keys are indistinguishable misses.
/// Connectivity failures and timeouts surface as
/// [`CacheError::BackendConnectivity`], never as misses.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("ttl", &self.config.ttl)
            .field("key_prefix", &self.config.key_prefix)
            .field("operation_timeout", &self.config.operation_timeout)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Connects to Redis; an invalid URL or unreachable server is an error
    pub async fn new(config: RedisCacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::configuration(format!("Invalid Redis URL: {}", e)))?;

        let connect = ConnectionManager::new(client);
        let connection = tokio::time::timeout(config.connection_timeout, connect)
            .await
            .map_err(|_| {
                CacheError::connectivity(
                    BACKEND,
                    format!(
                        "Timed out connecting to Redis after {:?}",
                        config.connection_timeout
                    ),
                )
            })?
            .map_err(|e| {
                CacheError::connectivity(BACKEND, format!("Failed to connect to Redis: {}", e))
            })?;

        debug!(ttl = ?config.ttl, prefix = ?config.key_prefix, "Connected to Redis");

        Ok(Self { connection, config })
    }

    fn prefix_key(&self, key: &CacheKey) -> String {
        prefixed(self.config.key_prefix.as_deref(), key)
    }

    async fn bounded<T, F>(&self, op: &str, key: &CacheKey, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::connectivity(
                BACKEND,
                format!("Failed to {} key '{}': {}", op, key, e),
            )),
            Err(_) => Err(CacheError::connectivity(
                BACKEND,
                format!(
                    "Timed out after {:?} trying to {} key '{}'",
                    self.config.operation_timeout, op, key
                ),
            )),
        }
    }
}

/// PX argument for a TTL; at least one millisecond, saturating at `u64::MAX`
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis().max(1)).unwrap_or(u64::MAX)
}

fn prefixed(prefix: Option<&str>, key: &CacheKey) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<Vec<u8>> = self
            .bounded("get", key, conn.get::<_, Option<Vec<u8>>>(&prefixed_key))
            .await?;

        Ok(result.map(Bytes::from))
    }

    async fn set(&self, key: &CacheKey, value: Bytes) -> Result<(), CacheError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(&prefixed_key)
            .arg(&value[..])
            .arg("PX")
            .arg(ttl_millis(self.config.ttl));

        self.bounded("set", key, cmd.query_async::<()>(&mut conn))
            .await
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = self
            .bounded("delete", key, conn.del::<_, i32>(&prefixed_key))
            .await?;

        Ok(deleted > 0)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Durable
    }

    fn ttl(&self) -> Duration {
        self.config.ttl
    }
}
