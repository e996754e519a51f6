use url::Url;

/// Builds a web URL below `base` from raw path segments.
///
/// Segments are percent-encoded, so project and repository names with spaces
/// produce valid links.
fn web_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Web page of a repository.
///
/// e.g. <https://dev.azure.com/contoso/Fabrikam/_git/web-app>
pub fn repository_url(base: &Url, organization: &str, project: &str, repository: &str) -> String {
    web_url(base, &[organization, project, "_git", repository]).to_string()
}

/// Web page of a pull request.
///
/// e.g. <https://dev.azure.com/contoso/Fabrikam/_git/web-app/pullrequest/42>
pub fn pull_request_url(
    base: &Url,
    organization: &str,
    project: &str,
    repository: &str,
    pull_request_id: i64,
) -> String {
    let id = pull_request_id.to_string();
    web_url(
        base,
        &[organization, project, "_git", repository, "pullrequest", id.as_str()],
    )
    .to_string()
}

/// Results page of a build.
///
/// e.g. <https://dev.azure.com/contoso/Fabrikam/_build/results?buildId=1234>
pub fn build_results_url(base: &Url, organization: &str, project: &str, build_id: i64) -> String {
    let mut url = web_url(base, &[organization, project, "_build", "results"]);
    url.query_pairs_mut()
        .append_pair("buildId", &build_id.to_string());
    url.to_string()
}
