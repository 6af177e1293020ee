//! Cache infrastructure - Store implementations

mod factory;
mod in_memory;
mod redis;

pub use factory::{CacheConfig, CacheFactory, DEFAULT_REDIS_URL, DEFAULT_TTL};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig, LocalTtlMode};
pub use redis::{RedisCache, RedisCacheConfig};
