//! Storage backend trait definition

use std::fmt::{self, Debug};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::CacheError;

use super::key::CacheKey;

/// Storage backend variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Process memory, lost on restart
    #[default]
    Local,
    /// External key-value store, shared across processes
    Durable,
}

impl BackendKind {
    /// Picks the backend from the durable-store flag
    pub fn from_flag(use_durable: bool) -> Self {
        if use_durable {
            Self::Durable
        } else {
            Self::Local
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Durable => write!(f, "durable"),
        }
    }
}

/// Byte-level storage backend behind the memoization cache
///
/// Every entry shares the single TTL the backend was built with. Callers go
/// through the cache facade rather than talking to a backend directly.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Gets the stored bytes for a key; `None` for never-set and expired keys
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Stores bytes under a key, replacing any previous entry
    async fn set(&self, key: &CacheKey, value: Bytes) -> Result<(), CacheError>;

    /// Removes a key, returning whether it was present
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Which backend variant this is
    fn kind(&self) -> BackendKind;

    /// The process-wide TTL applied to entries
    fn ttl(&self) -> Duration;
}
