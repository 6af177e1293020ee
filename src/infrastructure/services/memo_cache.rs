//! Memoization cache facade
//!
//! The single entry point callers use to memoize expensive computations.
//! The store is chosen once, when the cache is built, and key derivation and
//! payload encoding are applied the same way whichever store is behind it.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::domain::CacheError;
use crate::domain::cache::{
    BackendKind, CacheKey, CacheKeyGenerator, CacheStore, JsonCodec, PayloadCodec,
    Sha256KeyGenerator,
};
use crate::infrastructure::cache::{CacheConfig, CacheFactory};

use super::single_flight::SingleFlight;

/// Outcome of a memoized computation
#[derive(Debug, Clone, PartialEq)]
pub struct Memoized<V> {
    pub value: V,
    /// True when the value came from the cache rather than a fresh computation
    pub cached: bool,
}

/// Snapshot of cache counters
///
/// Every lookup counts once as a hit or a miss. A single-flight waiter that
/// finds the value after waiting stays counted as a miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Stored entries that could not be decoded and were served as misses
    pub decode_failures: u64,
    /// Store round-trips that failed with a connectivity error
    pub backend_errors: u64,
    pub stores: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    decode_failures: AtomicU64,
    backend_errors: AtomicU64,
    stores: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            backend_errors: self.backend_errors.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }
}

/// Memoization cache over values of type `V`, encoded with codec `C`
pub struct MemoCache<V, C = JsonCodec<V>> {
    store: Arc<dyn CacheStore>,
    codec: C,
    key_generator: Sha256KeyGenerator,
    single_flight: Option<SingleFlight>,
    counters: Counters,
    _marker: PhantomData<fn() -> V>,
}

impl<V, C: fmt::Debug> fmt::Debug for MemoCache<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("store", &self.store)
            .field("codec", &self.codec)
            .field("single_flight", &self.single_flight.is_some())
            .finish()
    }
}

impl<V, C> MemoCache<V, C>
where
    V: Send + Sync,
    C: PayloadCodec<V>,
{
    /// Creates a cache over the given store with the default codec
    pub fn new(store: Arc<dyn CacheStore>) -> Self
    where
        C: Default,
    {
        Self::with_codec(store, C::default())
    }

    /// Creates a cache over the given store with a custom codec
    pub fn with_codec(store: Arc<dyn CacheStore>, codec: C) -> Self {
        Self {
            store,
            codec,
            key_generator: Sha256KeyGenerator::new(),
            single_flight: None,
            counters: Counters::default(),
            _marker: PhantomData,
        }
    }

    /// Builds the store selected by `config` and wraps it
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError>
    where
        C: Default,
    {
        let store = CacheFactory::new().create(config).await?;
        Ok(Self::from_store(store, config))
    }

    /// Wraps an existing store, applying the facade settings of `config`
    pub fn from_store(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self
    where
        C: Default,
    {
        let cache = Self::new(store);

        if config.single_flight {
            cache.with_single_flight()
        } else {
            cache
        }
    }

    /// De-duplicates concurrent misses for the same key in `get_or_compute`
    pub fn with_single_flight(mut self) -> Self {
        self.single_flight = Some(SingleFlight::new());
        self
    }

    /// The backend variant chosen at construction
    pub fn backend(&self) -> BackendKind {
        self.store.kind()
    }

    /// The process-wide TTL
    pub fn ttl(&self) -> Duration {
        self.store.ttl()
    }

    /// Returns a snapshot of the hit/miss counters
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Derives the cache key for a structured input
    pub fn get_cache_key(&self, input: &Value) -> CacheKey {
        self.key_generator.generate(input)
    }

    /// Derives the cache key for any serializable input
    pub fn cache_key_for<I>(&self, input: &I) -> Result<CacheKey, CacheError>
    where
        I: Serialize + ?Sized,
    {
        self.key_generator.generate_for(input)
    }

    /// Looks up a value; undecodable entries are reported as misses
    pub async fn get(&self, key: &CacheKey) -> Result<Option<V>, CacheError> {
        self.lookup(key, true).await
    }

    /// Encodes and stores a value under `key`
    pub async fn set(&self, key: &CacheKey, value: &V) -> Result<(), CacheError> {
        let bytes = self.codec.encode(value)?;

        self.store
            .set(key, bytes)
            .await
            .inspect_err(|e| self.record_backend_error("set", key, e))?;

        Counters::bump(&self.counters.stores);
        debug!(key = %key, backend = %self.store.kind(), "Cache store");
        Ok(())
    }

    /// Removes the entry for `key`
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.store
            .delete(key)
            .await
            .inspect_err(|e| self.record_backend_error("delete", key, e))
    }

    /// Returns the cached value for `key`, or runs `compute`, stores its
    /// result under `key` and returns it
    ///
    /// A failed computation stores nothing.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> Result<Memoized<V>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, CacheError>>,
    {
        if let Some(value) = self.lookup(key, true).await? {
            return Ok(Memoized {
                value,
                cached: true,
            });
        }

        let Some(flights) = &self.single_flight else {
            return self.compute_and_store(key, compute).await;
        };

        let _flight = flights.acquire(key).await;

        // Whoever held the key before us may have stored the value.
        if let Some(value) = self.lookup(key, false).await? {
            return Ok(Memoized {
                value,
                cached: true,
            });
        }

        self.compute_and_store(key, compute).await
    }

    /// Derives the key from `input`, then behaves like `get_or_compute`
    pub async fn memoize<I, F, Fut>(&self, input: &I, compute: F) -> Result<Memoized<V>, CacheError>
    where
        I: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, CacheError>>,
    {
        let key = self.cache_key_for(input)?;
        self.get_or_compute(&key, compute).await
    }

    async fn compute_and_store<F, Fut>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> Result<Memoized<V>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, CacheError>>,
    {
        let value = compute().await?;
        self.set(key, &value).await?;

        Ok(Memoized {
            value,
            cached: false,
        })
    }

    /// Reads and decodes `key`; `record` is false for re-reads of a call that
    /// was already counted
    async fn lookup(&self, key: &CacheKey, record: bool) -> Result<Option<V>, CacheError> {
        let bytes = self
            .store
            .get(key)
            .await
            .inspect_err(|e| self.record_backend_error("get", key, e))?;

        let Some(bytes) = bytes else {
            if record {
                Counters::bump(&self.counters.misses);
            }
            debug!(key = %key, "Cache miss");
            return Ok(None);
        };

        match self.codec.decode(&bytes) {
            Ok(value) => {
                if record {
                    Counters::bump(&self.counters.hits);
                }
                debug!(key = %key, "Cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                Counters::bump(&self.counters.decode_failures);
                if record {
                    Counters::bump(&self.counters.misses);
                }
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    fn record_backend_error(&self, op: &str, key: &CacheKey, e: &CacheError) {
        if e.is_connectivity() {
            Counters::bump(&self.counters.backend_errors);
        }
        error!(key = %key, backend = %self.store.kind(), op, error = %e, "Cache backend failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCacheStore;
    use crate::infrastructure::cache::{InMemoryCache, InMemoryCacheConfig};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn local_cache() -> MemoCache<Value> {
        MemoCache::new(Arc::new(InMemoryCache::new()))
    }

    #[tokio::test]
    async fn test_get_before_set_is_miss() {
        let cache = local_cache();
        let key = cache.get_cache_key(&json!({"owner": "a"}));

        assert!(cache.get(&key).await.unwrap().is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_hit_after_set() {
        let cache = local_cache();
        let key = cache.get_cache_key(&json!({"owner": "a"}));

        cache.set(&key, &json!({"match": 0.9})).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(json!({"match": 0.9})));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                stores: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_end_to_end_with_expiry() {
        let store = InMemoryCache::with_config(
            InMemoryCacheConfig::default().with_ttl(Duration::from_millis(80)),
        );
        let cache: MemoCache<Value> = MemoCache::new(Arc::new(store));

        let key = cache.get_cache_key(&json!({"owner": "a", "repo": "b", "title": "t"}));
        assert!(cache.get(&key).await.unwrap().is_none());

        cache.set(&key, &json!({"match": 0.9})).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(json!({"match": 0.9})));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_fails_open() {
        let generator = Sha256KeyGenerator::new();
        let key = generator.generate(&json!({"owner": "a"}));
        let store = Arc::new(MockCacheStore::new().with_entry(&key, &b"\x80\x04not json"[..]));
        let cache: MemoCache<Value> = MemoCache::new(store.clone());

        assert!(cache.get(&key).await.unwrap().is_none());
        assert_eq!(cache.stats().decode_failures, 1);

        cache.set(&key, &json!({"match": 0.9})).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(json!({"match": 0.9})));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_connectivity_error_is_not_a_miss() {
        let cache: MemoCache<Value> =
            MemoCache::new(Arc::new(MockCacheStore::new().with_error("connection refused")));
        let key = cache.get_cache_key(&json!("k"));

        let result = cache.get(&key).await;
        assert!(matches!(result, Err(CacheError::BackendConnectivity { .. })));

        let result = cache.set(&key, &json!(1)).await;
        assert!(matches!(result, Err(CacheError::BackendConnectivity { .. })));

        let stats = cache.stats();
        assert_eq!(stats.backend_errors, 2);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test]
    async fn test_serialization_error_stores_nothing() {
        use std::collections::BTreeMap;

        let store = Arc::new(MockCacheStore::new());
        let cache: MemoCache<BTreeMap<(u8, u8), String>> = MemoCache::new(store.clone());
        let key = cache.get_cache_key(&json!("k"));
        let value = BTreeMap::from([((1, 2), "x".to_string())]);

        let result = cache.set(&key, &value).await;
        assert!(matches!(result, Err(CacheError::Serialization { .. })));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_get_or_compute_runs_once() {
        let cache = local_cache();
        let key = cache.get_cache_key(&json!({"issue": 1}));
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_compute(&key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"match": 0.9}))
            })
            .await
            .unwrap();
        let second = cache
            .get_or_compute(&key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"match": 0.1}))
            })
            .await
            .unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.value, json!({"match": 0.9}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_computation_stores_nothing() {
        let store = Arc::new(MockCacheStore::new());
        let cache: MemoCache<Value> = MemoCache::new(store.clone());

        let result = cache
            .memoize(&json!({"issue": 2}), || async {
                Err(CacheError::computation("matcher unavailable"))
            })
            .await;

        assert!(matches!(result, Err(CacheError::Computation { .. })));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_without_single_flight_concurrent_misses_all_compute() {
        let cache = Arc::new(local_cache());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = cache.get_cache_key(&json!({"issue": 3}));

        let tasks = (0..4).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            let key = key.clone();
            async move {
                cache
                    .get_or_compute(&key, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(json!({"match": 0.5}))
                    })
                    .await
                    .unwrap()
            }
        });

        let results = futures::future::join_all(tasks).await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(results.iter().all(|r| r.value == json!({"match": 0.5})));
    }

    #[tokio::test]
    async fn test_single_flight_computes_once() {
        let cache = Arc::new(local_cache().with_single_flight());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = cache.get_cache_key(&json!({"issue": 4}));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute(&key, || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Ok(json!({"match": 0.7}))
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut computed = 0;
        for handle in handles {
            let result = handle.await.unwrap();
            assert_eq!(result.value, json!({"match": 0.7}));
            if !result.cached {
                computed += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(computed, 1);

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 8);
        assert_eq!(stats.stores, 1);
    }

    #[tokio::test]
    async fn test_concurrent_distinct_keys() {
        let cache = Arc::new(local_cache());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let key = cache.get_cache_key(&json!({ "issue": i }));
                    cache.set(&key, &json!({ "match": i })).await.unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..16 {
            let key = cache.get_cache_key(&json!({ "issue": i }));
            assert_eq!(cache.get(&key).await.unwrap(), Some(json!({ "match": i })));
        }
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = local_cache();
        let key = cache.get_cache_key(&json!("k"));

        cache.set(&key, &json!(1)).await.unwrap();

        assert!(cache.invalidate(&key).await.unwrap());
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_from_config() {
        let config = CacheConfig::local()
            .with_ttl(Duration::from_secs(90))
            .with_single_flight();

        let cache: MemoCache<Value> = MemoCache::connect(&config).await.unwrap();

        assert_eq!(cache.backend(), BackendKind::Local);
        assert_eq!(cache.ttl(), Duration::from_secs(90));
        assert!(cache.single_flight.is_some());
    }
}
