//! LLM completion service memoizing provider responses

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::domain::CacheError;
use crate::domain::completion::{CompletionProvider, CompletionRequest};

use super::memo_cache::{MemoCache, Memoized};

const NAMESPACE: &str = "llm:completions";

/// Sends completion requests to the provider, reusing earlier responses for
/// identical requests within the cache TTL
pub struct CompletionService {
    provider: Arc<dyn CompletionProvider>,
    cache: MemoCache<String>,
}

impl fmt::Debug for CompletionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionService")
            .field("provider", &"<CompletionProvider>")
            .field("cache", &self.cache)
            .finish()
    }
}

impl CompletionService {
    pub fn new(provider: Arc<dyn CompletionProvider>, cache: MemoCache<String>) -> Self {
        Self { provider, cache }
    }

    /// Completes the prompt; every request field takes part in the cache key
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Memoized<String>, CacheError> {
        let result = self
            .cache
            .memoize(&(NAMESPACE, request), || self.provider.complete(request))
            .await?;

        debug!(model = %request.model, cached = result.cached, "Completion served");
        Ok(result)
    }
}
