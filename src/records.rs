use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const BRANCH_PREFIX: &str = "refs/heads/";

/// Placeholder result for builds that have not finished yet.
pub const IN_PROGRESS_RESULT: &str = "in_progress";

/// Owning release name used when the caller supplies none.
pub const UNKNOWN_RELEASE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub state: String,
    pub visibility: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub source_ref_name: String,
    pub target_ref_name: String,
    /// REST resource URL as reported by the API
    pub url: String,
    /// Web page of the pull request
    pub display_url: String,
    /// Web page of the owning repository
    pub repository_url: String,
    pub repository: RepositoryRef,
}

impl PullRequest {
    pub fn source_branch(&self) -> &str {
        format_branch(&self.source_ref_name)
    }

    pub fn target_branch(&self) -> &str {
        format_branch(&self.target_ref_name)
    }
}

/// A single build run.
///
/// `start_time`/`finish_time` are `None` until the build has reached that
/// point, which drives the derived duration views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub id: i64,
    pub build_number: String,
    pub definition: String,
    pub definition_id: i64,
    pub status: String,
    pub result: String,
    pub reason: String,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub requested_by: String,
    pub requested_for: String,
    /// Raw `triggerInfo` document, kept verbatim
    pub trigger_info: String,
    pub source_branch: String,
    pub repository: Option<RepositoryRef>,
    pub organization: String,
    pub project: String,
    /// Web results page of the build
    pub results_url: String,
}

impl BuildInfo {
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.finish_time) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }

    pub fn duration_display(&self) -> String {
        self.duration()
            .map_or_else(|| "In progress".to_string(), format_duration)
    }

    pub fn formatted_branch(&self) -> &str {
        format_branch(&self.source_branch)
    }

    /// Commit or trigger message from the trigger blob, if one can be found.
    ///
    /// Never fails: unparsable or message-less blobs yield `None`.
    pub fn trigger_message(&self) -> Option<String> {
        let info: serde_json::Value = serde_json::from_str(&self.trigger_info).ok()?;
        let object = info.as_object()?;

        ["ci.message", "message", "pr.title"]
            .iter()
            .find_map(|key| object.get(*key).and_then(serde_json::Value::as_str))
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(ToString::to_string)
    }

    pub fn display_name(&self) -> String {
        match self.trigger_message() {
            Some(message) => format!("{} - {message}", self.build_number),
            None => self.build_number.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub name: String,
    pub definition_id: i64,
    pub definition_name: String,
    pub created_on: Option<DateTime<Utc>>,
    pub source_branch: String,
    pub stages: Vec<ReleaseStage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseStage {
    pub release_name: String,
    pub stage_name: String,
    pub status: String,
    /// `None` when the environment has never been deployed
    pub last_release_date: Option<DateTime<Utc>>,
}

/// Strips a leading `refs/heads/`, leaving anything else untouched.
pub fn format_branch(reference: &str) -> &str {
    reference.strip_prefix(BRANCH_PREFIX).unwrap_or(reference)
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds();
    if total_seconds >= 60 {
        format!("{} min {} sec", total_seconds / 60, total_seconds % 60)
    } else {
        format!("{total_seconds} sec")
    }
}
