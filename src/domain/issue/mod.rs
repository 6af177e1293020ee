//! Issue domain - issue analysis requests and the matching collaborator

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::CacheError;

/// A candidate file considered for an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub download_url: String,
}

impl FileInfo {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        download_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            download_url: download_url.into(),
        }
    }
}

/// The reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetails {
    pub owner: String,
    pub repo: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Full logical input of an issue analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueAnalysisRequest {
    pub owner: String,
    pub repo: String,
    pub filtered_files: Vec<FileInfo>,
    pub issue_details: IssueDetails,
}

/// Opaque match data produced by the matcher
pub type IssueMatches = Map<String, Value>;

/// Content/semantic matching routine ranking files against an issue
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IssueMatcher: Send + Sync {
    async fn match_files(
        &self,
        issue: &IssueDetails,
        files: &[FileInfo],
    ) -> Result<IssueMatches, CacheError>;
}
