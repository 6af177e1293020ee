//! Issuezz cache
//!
//! Memoization cache for the expensive calls behind issue analysis:
//! - SHA-256 key derivation over canonical JSON
//! - Pluggable payload codecs (JSON by default)
//! - In-memory (moka) and Redis backends selected once at startup
//! - Caching services for the file matcher and LLM completions

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::CacheError;
pub use infrastructure::cache::CacheConfig;
pub use infrastructure::services::MemoCache;
