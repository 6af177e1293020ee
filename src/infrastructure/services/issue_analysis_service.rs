//! Issue analysis service memoizing the file matcher

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::domain::CacheError;
use crate::domain::issue::{IssueAnalysisRequest, IssueMatcher, IssueMatches};

use super::memo_cache::MemoCache;

const NAMESPACE: &str = "issue_analysis";

/// Result of an issue analysis
#[derive(Debug, Clone, PartialEq)]
pub struct IssueAnalysis {
    pub matches: IssueMatches,
    /// Wall time spent answering, including cache round-trips
    pub elapsed: Duration,
    /// True when served from the cache
    pub cached: bool,
}

/// Analyzes issues against candidate files, reusing earlier results for
/// identical requests within the cache TTL
pub struct IssueAnalysisService {
    matcher: Arc<dyn IssueMatcher>,
    cache: MemoCache<IssueMatches>,
}

impl fmt::Debug for IssueAnalysisService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueAnalysisService")
            .field("matcher", &"<IssueMatcher>")
            .field("cache", &self.cache)
            .finish()
    }
}

impl IssueAnalysisService {
    pub fn new(matcher: Arc<dyn IssueMatcher>, cache: MemoCache<IssueMatches>) -> Self {
        Self { matcher, cache }
    }

    /// Runs the matcher for the request unless an identical request was
    /// answered within the TTL
    pub async fn analyze(
        &self,
        request: &IssueAnalysisRequest,
    ) -> Result<IssueAnalysis, CacheError> {
        let start = Instant::now();

        let result = self
            .cache
            .memoize(&(NAMESPACE, request), || {
                self.matcher
                    .match_files(&request.issue_details, &request.filtered_files)
            })
            .await?;

        let elapsed = start.elapsed();
        info!(
            owner = %request.owner,
            repo = %request.repo,
            files = request.filtered_files.len(),
            cached = result.cached,
            elapsed_ms = elapsed.as_millis() as u64,
            "Issue analysis completed"
        );

        Ok(IssueAnalysis {
            matches: result.value,
            elapsed,
            cached: result.cached,
        })
    }

    /// The underlying cache
    pub fn cache(&self) -> &MemoCache<IssueMatches> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCacheStore;
    use crate::domain::issue::{FileInfo, IssueDetails, MockIssueMatcher};
    use crate::infrastructure::cache::InMemoryCache;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_request(title: &str) -> IssueAnalysisRequest {
        IssueAnalysisRequest {
            owner: "a".to_string(),
            repo: "b".to_string(),
            filtered_files: vec![FileInfo::new(
                "lib.rs",
                "src/lib.rs",
                "https://raw.example.com/a/b/src/lib.rs",
            )],
            issue_details: IssueDetails {
                owner: "a".to_string(),
                repo: "b".to_string(),
                title: title.to_string(),
                description: "panics on empty input".to_string(),
                labels: vec!["bug".to_string()],
            },
        }
    }

    fn match_data(score: f64) -> IssueMatches {
        match json!({"src/lib.rs": {"match": score}}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_second_identical_request_is_cached() {
        let mut matcher = MockIssueMatcher::new();
        matcher
            .expect_match_files()
            .times(1)
            .returning(|_, _| Ok(match_data(0.9)));

        let service = IssueAnalysisService::new(
            Arc::new(matcher),
            MemoCache::new(Arc::new(InMemoryCache::new())),
        );
        let request = create_test_request("t");

        let first = service.analyze(&request).await.unwrap();
        let second = service.analyze(&request).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.matches, match_data(0.9));
    }

    #[tokio::test]
    async fn test_different_requests_are_computed() {
        let mut matcher = MockIssueMatcher::new();
        matcher
            .expect_match_files()
            .withf(|issue, _| issue.title == "first")
            .times(1)
            .returning(|_, _| Ok(match_data(0.9)));
        matcher
            .expect_match_files()
            .withf(|issue, _| issue.title == "second")
            .times(1)
            .returning(|_, _| Ok(match_data(0.2)));

        let service = IssueAnalysisService::new(
            Arc::new(matcher),
            MemoCache::new(Arc::new(InMemoryCache::new())),
        );

        let first = service.analyze(&create_test_request("first")).await.unwrap();
        let second = service.analyze(&create_test_request("second")).await.unwrap();

        assert_eq!(first.matches, match_data(0.9));
        assert_eq!(second.matches, match_data(0.2));
        assert!(!second.cached);
    }

    #[tokio::test]
    async fn test_matcher_failure_is_not_cached() {
        let attempts = AtomicUsize::new(0);
        let mut matcher = MockIssueMatcher::new();
        matcher.expect_match_files().times(2).returning(move |_, _| {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(CacheError::computation("matcher timed out"))
            } else {
                Ok(match_data(0.4))
            }
        });

        let service = IssueAnalysisService::new(
            Arc::new(matcher),
            MemoCache::new(Arc::new(InMemoryCache::new())),
        );
        let request = create_test_request("t");

        assert!(service.analyze(&request).await.is_err());

        let retry = service.analyze(&request).await.unwrap();
        assert!(!retry.cached);
        assert_eq!(retry.matches, match_data(0.4));
    }

    #[tokio::test]
    async fn test_backend_outage_surfaces() {
        let mut matcher = MockIssueMatcher::new();
        matcher.expect_match_files().times(0);

        let service = IssueAnalysisService::new(
            Arc::new(matcher),
            MemoCache::new(Arc::new(MockCacheStore::new().with_error("connection reset"))),
        );

        let result = service.analyze(&create_test_request("t")).await;
        assert!(matches!(result, Err(CacheError::BackendConnectivity { .. })));
    }
}
