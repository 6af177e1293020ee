//! Cache key derivation
//!
//! Keys are the hex-encoded SHA-256 digest of a canonical JSON rendering of
//! the input. Canonical means object members are emitted in lexicographic key
//! order at every depth with no insignificant whitespace, so two mappings that
//! differ only in member order derive the same key. Scalars keep serde_json's
//! rendering, so `1` and `1.0` still derive different keys.
//!
//! This is a best-effort memoization key, not a correctness-critical
//! deduplication identifier.

use std::fmt::{self, Debug};

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::CacheError;

/// Opaque cache key derived from an input value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the string representation of the key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trait for deriving cache keys from structured input
pub trait CacheKeyGenerator: Send + Sync + Debug {
    /// Derives a key from an already structured value; total over all values
    fn generate(&self, input: &Value) -> CacheKey;

    /// Derives a key from any serializable input
    fn generate_for<T>(&self, input: &T) -> Result<CacheKey, CacheError>
    where
        Self: Sized,
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(input).map_err(|e| {
            CacheError::serialization(format!("Failed to render cache key input: {}", e))
        })?;

        Ok(self.generate(&value))
    }
}

/// Key generator hashing the canonical rendering with SHA-256
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256KeyGenerator;

impl Sha256KeyGenerator {
    /// Creates a new SHA-256 key generator
    pub fn new() -> Self {
        Self
    }
}

impl CacheKeyGenerator for Sha256KeyGenerator {
    fn generate(&self, input: &Value) -> CacheKey {
        let digest = Sha256::digest(canonical_string(input).as_bytes());
        CacheKey(hex::encode(digest))
    }
}

/// Renders a value as canonical JSON text
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(member, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
