//! In-memory store implementation using moka

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache as MokaCache;

use crate::domain::CacheError;
use crate::domain::cache::{BackendKind, CacheKey, CacheStore};

/// How the in-memory store treats the configured TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalTtlMode {
    /// Entries older than the TTL are never returned and get evicted
    #[default]
    Enforced,
    /// Legacy behavior: entries live until process exit or capacity eviction
    Unenforced,
}

impl fmt::Display for LocalTtlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalTtlMode::Enforced => write!(f, "enforced"),
            LocalTtlMode::Unenforced => write!(f, "unenforced"),
        }
    }
}

impl FromStr for LocalTtlMode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enforced" => Ok(LocalTtlMode::Enforced),
            "unenforced" | "legacy" => Ok(LocalTtlMode::Unenforced),
            _ => Err(CacheError::configuration(format!(
                "Unknown local TTL mode: {}. Valid modes: enforced, unenforced",
                s
            ))),
        }
    }
}

/// Configuration for in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries; unbounded when `None`
    pub max_capacity: Option<u64>,
    /// TTL applied to every entry
    pub ttl: Duration,
    /// Whether the TTL is enforced on read
    pub ttl_mode: LocalTtlMode,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: Some(10_000),
            ttl: Duration::from_secs(3600), // 1 hour
            ttl_mode: LocalTtlMode::Enforced,
        }
    }
}

impl InMemoryCacheConfig {
    /// Sets the maximum capacity
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Removes the capacity bound
    pub fn unbounded(mut self) -> Self {
        self.max_capacity = None;
        self
    }

    /// Sets the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the TTL mode
    pub fn with_ttl_mode(mut self, mode: LocalTtlMode) -> Self {
        self.ttl_mode = mode;
        self
    }
}

/// Entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Bytes,
    inserted_at: Instant,
}

/// Process-local store backed by a concurrent moka cache
///
/// Contents are lost on restart. With [`LocalTtlMode::Enforced`] an entry is
/// never returned once its TTL has elapsed.
#[derive(Debug)]
pub struct InMemoryCache {
    cache: MokaCache<CacheKey, CacheEntry>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    /// Creates a new in-memory store with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    /// Creates a new in-memory store with the given configuration
    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let mut builder = MokaCache::builder();

        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        if config.ttl_mode == LocalTtlMode::Enforced {
            builder = builder.time_to_live(config.ttl);
        }

        Self {
            cache: builder.build(),
            config,
        }
    }

    /// Returns the active TTL mode
    pub fn ttl_mode(&self) -> LocalTtlMode {
        self.config.ttl_mode
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.config.ttl_mode == LocalTtlMode::Enforced
            && entry.inserted_at.elapsed() > self.config.ttl
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        match self.cache.get(key).await {
            // Left for moka to evict; removing here could drop a newer set.
            Some(entry) if self.is_expired(&entry) => Ok(None),
            Some(entry) => Ok(Some(entry.data)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: Bytes) -> Result<(), CacheError> {
        let entry = CacheEntry {
            data: value,
            inserted_at: Instant::now(),
        };

        self.cache.insert(key.clone(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn ttl(&self) -> Duration {
        self.config.ttl
    }
}
