//! Infrastructure services

mod completion_service;
mod issue_analysis_service;
mod memo_cache;
mod single_flight;

pub use completion_service::CompletionService;
pub use issue_analysis_service::{IssueAnalysis, IssueAnalysisService};
pub use memo_cache::{CacheStats, MemoCache, Memoized};
pub use single_flight::{FlightGuard, SingleFlight};
