//! Domain layer - Cache contracts and collaborator boundaries

pub mod cache;
pub mod completion;
pub mod error;
pub mod issue;

pub use cache::{
    BackendKind, CacheKey, CacheKeyGenerator, CacheStore, JsonCodec, PayloadCodec,
    Sha256KeyGenerator,
};
pub use completion::{CompletionProvider, CompletionRequest};
pub use error::CacheError;
pub use issue::{FileInfo, IssueAnalysisRequest, IssueDetails, IssueMatcher, IssueMatches};
