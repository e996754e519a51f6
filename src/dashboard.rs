use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::providers::AzureDevOpsProvider;
use crate::records::{BuildInfo, PullRequest, ReleaseStage};

/// One dashboard panel: either its records or the reason they could not be
/// loaded. Panels fail independently of each other.
#[derive(Debug, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Loaded(Vec<T>),
    Failed(String),
}

impl<T> From<Result<Vec<T>>> for Panel<T> {
    fn from(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(items) => Self::Loaded(items),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// Everything the dashboard view shows for one project.
#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub organization: String,
    pub project: String,
    pub collected_at: DateTime<Utc>,
    pub pull_requests: Panel<PullRequest>,
    pub builds: Panel<BuildInfo>,
    pub release_stages: Panel<ReleaseStage>,
}

impl DashboardSnapshot {
    /// Loads all panels concurrently.
    pub async fn collect(provider: &AzureDevOpsProvider, project: &str) -> Self {
        let (pull_requests, builds, release_stages) = tokio::join!(
            provider.list_pull_requests(project),
            provider.list_builds(project),
            provider.list_release_stages(project),
        );

        Self {
            organization: provider.organization().to_string(),
            project: project.to_string(),
            collected_at: Utc::now(),
            pull_requests: pull_requests.into(),
            builds: builds.into(),
            release_stages: release_stages.into(),
        }
    }
}
