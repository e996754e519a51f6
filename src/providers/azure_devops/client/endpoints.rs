use url::Url;

use super::core::AzureDevOpsClient;

fn api_url(base: &Url, segments: &[&str], query: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    url
}

impl AzureDevOpsClient {
    /// `GET {base}/{org}/_apis/projects`
    pub fn projects_url(&self) -> Url {
        api_url(
            &self.base_url,
            &[self.organization.as_str(), "_apis", "projects"],
            &[("api-version", self.api_version.as_str())],
        )
    }

    /// `GET {base}/{org}/{project}/_apis/git/repositories`
    pub fn repositories_url(&self, project: &str) -> Url {
        api_url(
            &self.base_url,
            &[self.organization.as_str(), project, "_apis", "git", "repositories"],
            &[("api-version", self.api_version.as_str())],
        )
    }

    /// Active pull requests of one repository.
    pub fn pull_requests_url(&self, project: &str, repository_id: &str) -> Url {
        api_url(
            &self.base_url,
            &[
                self.organization.as_str(),
                project,
                "_apis",
                "git",
                "repositories",
                repository_id,
                "pullrequests",
            ],
            &[
                ("searchCriteria.status", "active"),
                ("api-version", self.api_version.as_str()),
            ],
        )
    }

    pub fn builds_url(&self, project: &str) -> Url {
        api_url(
            &self.base_url,
            &[self.organization.as_str(), project, "_apis", "build", "builds"],
            &[("api-version", self.api_version.as_str())],
        )
    }

    /// Release definitions with their environments expanded.
    pub fn release_definitions_url(&self, project: &str) -> Url {
        api_url(
            &self.release_url,
            &[self.organization.as_str(), project, "_apis", "release", "definitions"],
            &[
                ("$expand", "environments"),
                ("api-version", self.release_api_version.as_str()),
            ],
        )
    }

    /// Most recent release of a definition, environments expanded.
    pub fn latest_release_url(&self, project: &str, definition_id: i64) -> Url {
        let definition_id = definition_id.to_string();
        api_url(
            &self.release_url,
            &[self.organization.as_str(), project, "_apis", "release", "releases"],
            &[
                ("definitionId", definition_id.as_str()),
                ("$top", "1"),
                ("$expand", "environments"),
                ("api-version", self.release_api_version.as_str()),
            ],
        )
    }
}
