use log::{debug, warn};
use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::records::{
    BuildInfo, Project, PullRequest, Release, ReleaseStage, RepositoryRef, IN_PROGRESS_RESULT,
    UNKNOWN_RELEASE,
};

use super::fields::{
    field, i64_field, nested, nested_string, required_i64, required_string, string_field,
    timestamp_field,
};
use super::links;

/// Scope a node is mapped in. Derived URLs are always computed from this,
/// never read from the payload.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    pub web_url: &'a Url,
    pub organization: &'a str,
    pub project: &'a str,
}

/// Maps every element, logging and skipping the ones that fail.
pub fn map_items<T, F>(items: &[Value], entity: &str, map: F) -> Vec<T>
where
    F: Fn(&Value) -> Result<T>,
{
    items
        .iter()
        .filter_map(|item| match map(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping {entity}: {e}");
                debug!("Unmappable {entity} payload: {item}");
                None
            }
        })
        .collect()
}

pub fn map_project(node: &Value) -> Result<Project> {
    Ok(Project {
        id: required_string(node, "id", "project")?,
        name: string_field(node, "name"),
        description: string_field(node, "description"),
        url: string_field(node, "url"),
        state: string_field(node, "state"),
        visibility: string_field(node, "visibility"),
    })
}

pub fn map_repository(node: &Value) -> RepositoryRef {
    RepositoryRef {
        id: string_field(node, "id"),
        name: string_field(node, "name"),
        url: string_field(node, "url"),
    }
}

/// Maps a pull request listed under `parent`. The parent repository stands in
/// when the payload carries no named repository of its own.
pub fn map_pull_request(
    node: &Value,
    ctx: &MappingContext<'_>,
    parent: &RepositoryRef,
) -> Result<PullRequest> {
    let id = required_i64(node, "pullRequestId", "pull request")?;
    let repository = nested(node, "repository")
        .map(map_repository)
        .filter(|repository| !repository.name.is_empty())
        .unwrap_or_else(|| parent.clone());

    Ok(PullRequest {
        id,
        title: string_field(node, "title"),
        status: string_field(node, "status"),
        created_at: timestamp_field(node, "creationDate"),
        created_by: nested_string(node, "createdBy", "displayName"),
        source_ref_name: string_field(node, "sourceRefName"),
        target_ref_name: string_field(node, "targetRefName"),
        url: string_field(node, "url"),
        display_url: links::pull_request_url(
            ctx.web_url,
            ctx.organization,
            ctx.project,
            &repository.name,
            id,
        ),
        repository_url: links::repository_url(
            ctx.web_url,
            ctx.organization,
            ctx.project,
            &repository.name,
        ),
        repository,
    })
}

pub fn map_build(node: &Value, ctx: &MappingContext<'_>) -> Result<BuildInfo> {
    let id = required_i64(node, "id", "build")?;
    let definition = nested(node, "definition");

    let result = string_field(node, "result");
    let result = if result.is_empty() {
        IN_PROGRESS_RESULT.to_string()
    } else {
        result
    };

    // The project label comes from the payload when present so builds listed
    // through a project id still read naturally.
    let project = nested_string(node, "project", "name");
    let project = if project.is_empty() {
        ctx.project.to_string()
    } else {
        project
    };

    Ok(BuildInfo {
        id,
        build_number: string_field(node, "buildNumber"),
        definition: definition
            .map(|d| string_field(d, "name"))
            .unwrap_or_default(),
        definition_id: definition.and_then(|d| i64_field(d, "id")).unwrap_or(0),
        status: string_field(node, "status"),
        result,
        reason: string_field(node, "reason"),
        start_time: timestamp_field(node, "startTime"),
        finish_time: timestamp_field(node, "finishTime"),
        requested_by: nested_string(node, "requestedBy", "displayName"),
        requested_for: nested_string(node, "requestedFor", "displayName"),
        trigger_info: field(node, "triggerInfo")
            .map(Value::to_string)
            .unwrap_or_default(),
        source_branch: string_field(node, "sourceBranch"),
        repository: nested(node, "repository").map(map_repository),
        organization: ctx.organization.to_string(),
        project,
        results_url: links::build_results_url(ctx.web_url, ctx.organization, ctx.project, id),
    })
}

/// Maps one release environment into a stage owned by `release_name`.
pub fn map_release_stage(environment: &Value, release_name: Option<&str>) -> Result<ReleaseStage> {
    let stage_name = required_string(environment, "name", "release stage")?;

    Ok(ReleaseStage {
        release_name: release_name
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_RELEASE)
            .to_string(),
        stage_name,
        status: string_field(environment, "status"),
        last_release_date: timestamp_field(environment, "modifiedOn"),
    })
}

/// Maps every environment of a release, skipping the unmappable ones.
pub fn map_release_stages(release: &Value, release_name: Option<&str>) -> Vec<ReleaseStage> {
    field(release, "environments")
        .and_then(Value::as_array)
        .map(|environments| {
            map_items(environments, "release stage", |env| {
                map_release_stage(env, release_name)
            })
        })
        .unwrap_or_default()
}

/// Maps the latest release of a definition. The definition's own id and name
/// stand in when the release omits `releaseDefinition`.
pub fn map_release(node: &Value, definition_id: i64, definition_name: &str) -> Result<Release> {
    let id = required_i64(node, "id", "release")?;
    let name = string_field(node, "name");
    let stages = map_release_stages(node, Some(&name));

    let definition = nested(node, "releaseDefinition");
    let definition_name = definition
        .map(|d| string_field(d, "name"))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| definition_name.to_string());

    Ok(Release {
        id,
        definition_id: definition
            .and_then(|d| i64_field(d, "id"))
            .unwrap_or(definition_id),
        definition_name,
        created_on: timestamp_field(node, "createdOn"),
        source_branch: release_source_branch(node),
        stages,
        name,
    })
}

/// Branch of the primary artifact, or `""` if the release has none.
fn release_source_branch(release: &Value) -> String {
    let artifacts = field(release, "artifacts").and_then(Value::as_array);
    let Some(artifacts) = artifacts else {
        return String::new();
    };

    let primary = artifacts
        .iter()
        .find(|a| field(a, "isPrimary").and_then(Value::as_bool) == Some(true))
        .or_else(|| artifacts.first());

    primary
        .and_then(|a| nested(a, "definitionReference"))
        .map(|reference| nested_string(reference, "branch", "name"))
        .unwrap_or_default()
}
