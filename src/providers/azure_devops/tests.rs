use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use super::AzureDevOpsProvider;
use crate::auth::{CredentialEvent, CredentialStore};
use crate::config::AzureDevOpsConfig;
use crate::error::DashboardError;

fn provider_for(server: &ServerGuard) -> (AzureDevOpsProvider, Arc<CredentialStore>) {
    provider_with_concurrency(server, 1)
}

fn provider_with_concurrency(
    server: &ServerGuard,
    max_concurrent_requests: usize,
) -> (AzureDevOpsProvider, Arc<CredentialStore>) {
    let config = AzureDevOpsConfig {
        organization: Some("contoso".to_string()),
        base_url: server.url(),
        release_url: server.url(),
        max_concurrent_requests,
        ..AzureDevOpsConfig::default()
    };

    let credentials = Arc::new(CredentialStore::new());
    credentials.set("secret").unwrap();

    let provider = AzureDevOpsProvider::new(&config, Arc::clone(&credentials)).unwrap();
    (provider, credentials)
}

async fn mock_json(server: &mut ServerGuard, path: &str, body: serde_json::Value) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

async fn mock_status(server: &mut ServerGuard, path: &str, status: usize) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(status)
        .with_body("error")
        .create_async()
        .await
}

fn pull_request(id: i64, repository: &str) -> serde_json::Value {
    json!({
        "pullRequestId": id,
        "title": format!("PR {id}"),
        "status": "active",
        "creationDate": "2024-01-15T10:30:00Z",
        "createdBy": {"displayName": "Ada"},
        "sourceRefName": "refs/heads/feature",
        "targetRefName": "refs/heads/main",
        "repository": {"id": repository, "name": repository}
    })
}

#[tokio::test]
async fn test_list_projects() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/contoso/_apis/projects")
        .match_query(Matcher::UrlEncoded("api-version".into(), "7.0".into()))
        .match_header("authorization", "Basic OnNlY3JldA==")
        .match_header("user-agent", "AzDash/1.0")
        .with_status(200)
        .with_body(
            json!({
                "count": 2,
                "value": [
                    {"id": "p-1", "name": "Fabrikam", "state": "wellFormed", "visibility": "private"},
                    {"id": "p-2", "name": "Tailspin", "description": null}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (provider, _) = provider_for(&server);
    let projects = provider.list_projects().await.unwrap();

    mock.assert_async().await;
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].name, "Fabrikam");
    assert_eq!(projects[0].visibility, "private");
    assert_eq!(projects[1].description, "");
}

#[tokio::test]
async fn test_list_pull_requests_skips_failing_repository() {
    let mut server = mockito::Server::new_async().await;
    let _repos = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories",
        json!({"count": 3, "value": [
            {"id": "repo-1", "name": "repo-1"},
            {"id": "repo-2", "name": "repo-2"},
            {"id": "repo-3", "name": "repo-3"}
        ]}),
    )
    .await;
    let _first = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories/repo-1/pullrequests",
        json!({"count": 2, "value": [pull_request(1, "repo-1"), pull_request(2, "repo-1")]}),
    )
    .await;
    let failing = mock_status(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories/repo-2/pullrequests",
        500,
    )
    .await;
    let _third = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories/repo-3/pullrequests",
        json!({"count": 1, "value": [pull_request(3, "repo-3")]}),
    )
    .await;

    let (provider, _) = provider_for(&server);
    let pull_requests = provider.list_pull_requests("Fabrikam").await.unwrap();

    failing.assert_async().await;
    let ids: Vec<i64> = pull_requests.iter().map(|pr| pr.id).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert!(pull_requests.iter().all(|pr| pr.repository.id != "repo-2"));
    assert_eq!(
        pull_requests[2].display_url,
        format!("{}/contoso/Fabrikam/_git/repo-3/pullrequest/3", server.url())
    );
}

#[tokio::test]
async fn test_list_pull_requests_skips_unmappable_items() {
    let mut server = mockito::Server::new_async().await;
    let _repos = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories",
        json!({"value": [{"id": "repo-1", "name": "repo-1"}, {"name": "no id"}]}),
    )
    .await;
    let _prs = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories/repo-1/pullrequests",
        json!({"value": [pull_request(1, "repo-1"), {"title": "missing id"}]}),
    )
    .await;

    let (provider, _) = provider_for(&server);
    let pull_requests = provider.list_pull_requests("Fabrikam").await.unwrap();

    assert_eq!(pull_requests.len(), 1);
    assert_eq!(pull_requests[0].id, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_pull_requests_keeps_repository_order_when_concurrent() {
    let mut server = mockito::Server::new_async().await;
    let _repos = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories",
        json!({"value": [
            {"id": "repo-1", "name": "repo-1"},
            {"id": "repo-2", "name": "repo-2"},
            {"id": "repo-3", "name": "repo-3"},
            {"id": "repo-4", "name": "repo-4"}
        ]}),
    )
    .await;

    // Earlier repositories answer slower than later ones.
    let mut mocks = Vec::new();
    for (index, delay_ms) in [(1, 300), (2, 200), (3, 100), (4, 0)] {
        let repository = format!("repo-{index}");
        let body = json!({"value": [pull_request(index, &repository)]}).to_string();
        let mock = server
            .mock(
                "GET",
                format!("/contoso/Fabrikam/_apis/git/repositories/{repository}/pullrequests")
                    .as_str(),
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body_from_request(move |_| {
                std::thread::sleep(Duration::from_millis(delay_ms));
                body.clone().into_bytes()
            })
            .create_async()
            .await;
        mocks.push(mock);
    }

    let (provider, _) = provider_with_concurrency(&server, 4);
    let pull_requests = provider.list_pull_requests("Fabrikam").await.unwrap();

    for mock in &mocks {
        mock.assert_async().await;
    }
    let ids: Vec<i64> = pull_requests.iter().map(|pr| pr.id).collect();
    assert_eq!(ids, [1, 2, 3, 4]);
}

#[tokio::test]
async fn test_list_pull_requests_uses_listed_repository_when_payload_has_none() {
    let mut server = mockito::Server::new_async().await;
    let _repos = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories",
        json!({"value": [{"id": "r-1", "name": "web"}]}),
    )
    .await;
    let _prs = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories/r-1/pullrequests",
        json!({"value": [{"pullRequestId": 7, "title": "x"}]}),
    )
    .await;

    let (provider, _) = provider_for(&server);
    let pull_requests = provider.list_pull_requests("Fabrikam").await.unwrap();

    assert_eq!(pull_requests.len(), 1);
    let pr = &pull_requests[0];
    assert_eq!(pr.repository.id, "r-1");
    assert_eq!(pr.repository.name, "web");
    assert_eq!(
        pr.display_url,
        format!("{}/contoso/Fabrikam/_git/web/pullrequest/7", server.url())
    );
    assert_eq!(
        pr.repository_url,
        format!("{}/contoso/Fabrikam/_git/web", server.url())
    );
}

#[tokio::test]
async fn test_list_pull_requests_rejected_credential_fails_the_call() {
    let mut server = mockito::Server::new_async().await;
    let _repos = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories",
        json!({"value": [{"id": "repo-1", "name": "repo-1"}, {"id": "repo-2", "name": "repo-2"}]}),
    )
    .await;
    let rejected = mock_status(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories/repo-1/pullrequests",
        401,
    )
    .await;
    let _second = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/git/repositories/repo-2/pullrequests",
        json!({"value": [pull_request(2, "repo-2")]}),
    )
    .await;

    let (provider, credentials) = provider_for(&server);
    let result = provider.list_pull_requests("Fabrikam").await;

    rejected.assert_async().await;
    assert!(matches!(
        result,
        Err(DashboardError::RemoteRequestFailed { status: 401, .. })
    ));
    assert_eq!(credentials.get(), "");
}

#[tokio::test]
async fn test_list_pull_requests_repository_failure_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let _repos = mock_status(&mut server, "/contoso/Fabrikam/_apis/git/repositories", 404).await;

    let (provider, _) = provider_for(&server);
    let result = provider.list_pull_requests("Fabrikam").await;

    assert!(matches!(
        result,
        Err(DashboardError::RemoteRequestFailed { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_missing_project_fails_before_any_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (provider, _) = provider_for(&server);

    assert!(matches!(
        provider.list_pull_requests("").await,
        Err(DashboardError::ConfigurationMissing("project"))
    ));
    assert!(matches!(
        provider.list_builds("  ").await,
        Err(DashboardError::ConfigurationMissing("project"))
    ));
    assert!(matches!(
        provider.list_release_stages("").await,
        Err(DashboardError::ConfigurationMissing("project"))
    ));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_organization_fails() {
    let server = mockito::Server::new_async().await;
    let config = AzureDevOpsConfig {
        base_url: server.url(),
        ..AzureDevOpsConfig::default()
    };
    let provider = AzureDevOpsProvider::new(&config, Arc::new(CredentialStore::new())).unwrap();

    assert!(matches!(
        provider.list_projects().await,
        Err(DashboardError::ConfigurationMissing("organization"))
    ));
    assert!(matches!(
        provider.list_releases("Fabrikam").await,
        Err(DashboardError::ConfigurationMissing("organization"))
    ));
}

#[tokio::test]
async fn test_missing_credential_fails() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (provider, credentials) = provider_for(&server);
    credentials.clear();

    assert!(matches!(
        provider.list_builds("Fabrikam").await,
        Err(DashboardError::MissingCredential)
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_list_builds() {
    let mut server = mockito::Server::new_async().await;
    let _builds = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/build/builds",
        json!({"count": 3, "value": [
            {
                "id": 10,
                "buildNumber": "20240115.1",
                "status": "completed",
                "result": "failed",
                "startTime": "2024-01-15T10:00:00Z",
                "finishTime": "2024-01-15T10:00:42Z",
                "definition": {"id": 7, "name": "CI"},
                "triggerInfo": {"ci.message": "Bump deps"}
            },
            {"buildNumber": "no id"},
            {
                "id": 11,
                "buildNumber": "20240115.2",
                "status": "inProgress",
                "startTime": "2024-01-15T11:00:00Z",
                "definition": {"id": 7, "name": "CI"}
            }
        ]}),
    )
    .await;

    let (provider, _) = provider_for(&server);
    let builds = provider.list_builds("Fabrikam").await.unwrap();

    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0].duration_display(), "42 sec");
    assert_eq!(builds[0].display_name(), "20240115.1 - Bump deps");
    assert_eq!(builds[1].result, "in_progress");
    assert_eq!(builds[1].duration_display(), "In progress");
    assert_eq!(
        builds[1].results_url,
        format!("{}/contoso/Fabrikam/_build/results?buildId=11", server.url())
    );
}

#[tokio::test]
async fn test_list_builds_failure_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let _builds = mock_status(&mut server, "/contoso/Fabrikam/_apis/build/builds", 500).await;

    let (provider, _) = provider_for(&server);
    assert!(matches!(
        provider.list_builds("Fabrikam").await,
        Err(DashboardError::RemoteRequestFailed { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_envelope_without_value_yields_no_builds() {
    let mut server = mockito::Server::new_async().await;
    let _builds = mock_json(
        &mut server,
        "/contoso/Fabrikam/_apis/build/builds",
        json!({"count": 0}),
    )
    .await;

    let (provider, _) = provider_for(&server);
    assert!(provider.list_builds("Fabrikam").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthorized_clears_credential() {
    let mut server = mockito::Server::new_async().await;
    let _builds = mock_status(&mut server, "/contoso/Fabrikam/_apis/build/builds", 401).await;

    let (provider, credentials) = provider_for(&server);
    let mut events = credentials.subscribe();

    assert!(matches!(
        provider.list_builds("Fabrikam").await,
        Err(DashboardError::RemoteRequestFailed { status: 401, .. })
    ));
    assert_eq!(credentials.get(), "");
    assert_eq!(events.try_recv(), Ok(CredentialEvent::Cleared));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

async fn mock_release_definitions(server: &mut ServerGuard, project: &str) -> Mock {
    mock_json(
        server,
        &format!("/contoso/{project}/_apis/release/definitions"),
        json!({"count": 2, "value": [
            {"id": 1, "name": "Web Release", "environments": [{"name": "QA"}, {"name": "Prod"}]},
            {"id": 2, "name": "Api Release", "environments": [{"name": "QA"}]}
        ]}),
    )
    .await
}

async fn mock_latest_release(
    server: &mut ServerGuard,
    project: &str,
    definition_id: &str,
    body: serde_json::Value,
) -> Mock {
    server
        .mock("GET", format!("/contoso/{project}/_apis/release/releases").as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("definitionId".into(), definition_id.into()),
            Matcher::UrlEncoded("$top".into(), "1".into()),
            Matcher::UrlEncoded("$expand".into(), "environments".into()),
        ]))
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await
}

fn release_with_two_environments() -> serde_json::Value {
    json!({"count": 1, "value": [{
        "id": 501,
        "name": "Release-42",
        "createdOn": "2024-01-16T07:00:00Z",
        "releaseDefinition": {"id": 1, "name": "Web Release"},
        "environments": [
            {"name": "QA", "status": "succeeded", "modifiedOn": "2024-01-16T08:00:00Z"},
            {"name": "Prod", "status": "notStarted"}
        ]
    }]})
}

#[tokio::test]
async fn test_list_release_stages() {
    let mut server = mockito::Server::new_async().await;
    let _definitions = mock_release_definitions(&mut server, "ProjectX").await;
    let _first = mock_latest_release(&mut server, "ProjectX", "1", release_with_two_environments()).await;
    let second =
        mock_latest_release(&mut server, "ProjectX", "2", json!({"count": 0, "value": []})).await;

    let (provider, _) = provider_for(&server);
    let stages = provider.list_release_stages("ProjectX").await.unwrap();

    second.assert_async().await;
    assert_eq!(stages.len(), 2);
    assert!(stages.iter().all(|stage| stage.release_name == "Web Release"));
    assert_eq!(stages[0].stage_name, "QA");
    assert!(stages[0].last_release_date.is_some());
    assert_eq!(stages[1].stage_name, "Prod");
    assert!(stages[1].last_release_date.is_none());
}

#[tokio::test]
async fn test_list_releases_skips_failing_definition() {
    let mut server = mockito::Server::new_async().await;
    let _definitions = mock_release_definitions(&mut server, "Fabrikam").await;
    let _first = mock_latest_release(&mut server, "Fabrikam", "1", release_with_two_environments()).await;
    let _second = server
        .mock("GET", "/contoso/Fabrikam/_apis/release/releases")
        .match_query(Matcher::UrlEncoded("definitionId".into(), "2".into()))
        .with_status(503)
        .create_async()
        .await;

    let (provider, _) = provider_for(&server);
    let releases = provider.list_releases("Fabrikam").await.unwrap();

    assert_eq!(releases.len(), 1);
    let release = &releases[0];
    assert_eq!(release.id, 501);
    assert_eq!(release.name, "Release-42");
    assert_eq!(release.definition_name, "Web Release");
    assert_eq!(release.stages.len(), 2);
    assert!(release.stages.iter().all(|s| s.release_name == "Release-42"));
}

#[tokio::test]
async fn test_list_releases_definition_failure_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let _definitions =
        mock_status(&mut server, "/contoso/Fabrikam/_apis/release/definitions", 500).await;

    let (provider, _) = provider_for(&server);
    assert!(matches!(
        provider.list_releases("Fabrikam").await,
        Err(DashboardError::RemoteRequestFailed { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_list_release_stages_rejected_credential_fails_the_call() {
    let mut server = mockito::Server::new_async().await;
    let _definitions = mock_release_definitions(&mut server, "Fabrikam").await;
    let _first = server
        .mock("GET", "/contoso/Fabrikam/_apis/release/releases")
        .match_query(Matcher::UrlEncoded("definitionId".into(), "1".into()))
        .with_status(203)
        .with_body("<html>sign in</html>")
        .create_async()
        .await;
    let _second =
        mock_latest_release(&mut server, "Fabrikam", "2", release_with_two_environments()).await;

    let (provider, credentials) = provider_for(&server);
    let result = provider.list_release_stages("Fabrikam").await;

    assert!(matches!(
        result,
        Err(DashboardError::RemoteRequestFailed { status: 203, .. })
    ));
    assert_eq!(credentials.get(), "");
}

#[tokio::test]
async fn test_list_releases_falls_back_to_listed_definition() {
    let mut server = mockito::Server::new_async().await;
    let _definitions = mock_release_definitions(&mut server, "Fabrikam").await;
    let _first = mock_latest_release(
        &mut server,
        "Fabrikam",
        "1",
        json!({"value": [{"id": 700, "name": "Release-7"}]}),
    )
    .await;
    let _second =
        mock_latest_release(&mut server, "Fabrikam", "2", json!({"count": 0, "value": []})).await;

    let (provider, _) = provider_for(&server);
    let releases = provider.list_releases("Fabrikam").await.unwrap();

    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].definition_id, 1);
    assert_eq!(releases[0].definition_name, "Web Release");
}
