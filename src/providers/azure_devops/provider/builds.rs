use log::info;

use super::AzureDevOpsProvider;
use crate::error::Result;
use crate::providers::azure_devops::mappers::{map_build, map_items};
use crate::records::BuildInfo;

impl AzureDevOpsProvider {
    /// Lists the builds of `project` in the order the API returns them
    /// (most recent first).
    ///
    /// # Errors
    ///
    /// Configuration and credential errors, or `RemoteRequestFailed` on a
    /// non-success status.
    pub async fn list_builds(&self, project: &str) -> Result<Vec<BuildInfo>> {
        let ctx = self.scope(project)?;
        info!(
            "Fetching builds for org: {}, project: {project}",
            ctx.organization
        );

        let envelope = self
            .client
            .get_envelope(self.client.builds_url(project))
            .await?;

        let builds = map_items(&envelope.items, "build", |node| map_build(node, &ctx));

        info!("Retrieved {} builds", builds.len());
        Ok(builds)
    }
}
