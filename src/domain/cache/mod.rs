//! Cache domain - memoization cache building blocks

mod codec;
mod key;
mod store;

pub use codec::{JsonCodec, PayloadCodec};
pub use key::{CacheKey, CacheKeyGenerator, Sha256KeyGenerator, canonical_string};
pub use store::{BackendKind, CacheStore};

#[cfg(test)]
pub use store::mock::MockCacheStore;
