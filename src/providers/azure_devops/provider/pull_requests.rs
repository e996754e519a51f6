use futures::stream::{self, StreamExt, TryStreamExt};
use log::{info, warn};

use super::AzureDevOpsProvider;
use crate::error::Result;
use crate::providers::azure_devops::mappers::{
    map_items, map_pull_request, map_repository, MappingContext,
};
use crate::records::{PullRequest, RepositoryRef};

impl AzureDevOpsProvider {
    /// Lists active pull requests across every repository of `project`.
    ///
    /// Repositories whose pull request request fails are logged and skipped;
    /// the remaining repositories are still returned.
    ///
    /// # Errors
    ///
    /// Configuration and credential errors, or `RemoteRequestFailed` when the
    /// repository list itself cannot be fetched. A credential rejected while
    /// fetching any repository's pull requests also fails the whole call.
    pub async fn list_pull_requests(&self, project: &str) -> Result<Vec<PullRequest>> {
        let ctx = self.scope(project)?;
        info!(
            "Fetching pull requests for org: {}, project: {project}",
            ctx.organization
        );

        let envelope = self
            .client
            .get_envelope(self.client.repositories_url(project))
            .await?;

        let repositories: Vec<RepositoryRef> = envelope
            .items
            .iter()
            .filter_map(|node| {
                let repository = map_repository(node);
                if repository.id.is_empty() {
                    warn!("Skipping repository without an id: {node}");
                    None
                } else {
                    Some(repository)
                }
            })
            .collect();

        info!(
            "Fetching pull requests for {} repositories...",
            repositories.len()
        );

        let per_repository: Vec<Vec<PullRequest>> = stream::iter(&repositories)
            .map(|repository| self.fetch_repository_pull_requests(&ctx, repository))
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        let pull_requests: Vec<PullRequest> = per_repository.into_iter().flatten().collect();
        info!("Retrieved {} pull requests", pull_requests.len());

        Ok(pull_requests)
    }

    /// Pull requests of one repository. Only credential failures are returned
    /// as errors; anything else leaves the repository empty.
    async fn fetch_repository_pull_requests(
        &self,
        ctx: &MappingContext<'_>,
        repository: &RepositoryRef,
    ) -> Result<Vec<PullRequest>> {
        let url = self.client.pull_requests_url(ctx.project, &repository.id);

        match self.client.get_envelope(url).await {
            Ok(envelope) => Ok(map_items(&envelope.items, "pull request", |node| {
                map_pull_request(node, ctx, repository)
            })),
            Err(e) if e.is_credential_failure() => Err(e),
            Err(e) => {
                warn!(
                    "Failed to fetch pull requests for repository {}: {e}",
                    repository.id
                );
                Ok(Vec::new())
            }
        }
    }
}
