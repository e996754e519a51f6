use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use serde_json::Value;

use super::AzureDevOpsProvider;
use crate::error::Result;
use crate::providers::azure_devops::fields::{required_i64, string_field};
use crate::providers::azure_devops::mappers::{map_items, map_release, map_release_stages};
use crate::records::{Release, ReleaseStage};

/// A release definition as needed for the per-definition fan-out.
#[derive(Debug)]
struct ReleaseDefinition {
    id: i64,
    name: String,
}

fn map_definition(node: &Value) -> Result<ReleaseDefinition> {
    Ok(ReleaseDefinition {
        id: required_i64(node, "id", "release definition")?,
        name: string_field(node, "name"),
    })
}

impl AzureDevOpsProvider {
    /// Lists the stages of the latest release of every release definition.
    ///
    /// Each stage carries its definition's name as `release_name`. Definitions
    /// without releases contribute nothing.
    ///
    /// # Errors
    ///
    /// Configuration and credential errors, or `RemoteRequestFailed` when the
    /// definition list cannot be fetched.
    pub async fn list_release_stages(&self, project: &str) -> Result<Vec<ReleaseStage>> {
        info!("Fetching release stages for project: {project}");

        let stages: Vec<ReleaseStage> = self
            .latest_releases(project)
            .await?
            .into_iter()
            .flat_map(|(definition, release)| {
                map_release_stages(&release, Some(definition.name.as_str()))
            })
            .collect();

        info!("Retrieved {} release stages", stages.len());
        Ok(stages)
    }

    /// Lists the latest release of every release definition, with its stages.
    ///
    /// # Errors
    ///
    /// Same as [`Self::list_release_stages`].
    pub async fn list_releases(&self, project: &str) -> Result<Vec<Release>> {
        info!("Fetching releases for project: {project}");

        let releases: Vec<Release> = self
            .latest_releases(project)
            .await?
            .into_iter()
            .filter_map(|(definition, release)| {
                map_release(&release, definition.id, &definition.name)
                    .inspect_err(|e| warn!("Skipping release of definition {}: {e}", definition.id))
                    .ok()
            })
            .collect();

        info!("Retrieved {} releases", releases.len());
        Ok(releases)
    }

    /// Definitions paired with their most recent release, in definition order.
    /// A credential rejected on any definition fails the whole call.
    async fn latest_releases(&self, project: &str) -> Result<Vec<(ReleaseDefinition, Value)>> {
        let ctx = self.scope(project)?;
        debug!(
            "Fetching release definitions for org: {}, project: {project}",
            ctx.organization
        );

        let envelope = self
            .client
            .get_envelope(self.client.release_definitions_url(project))
            .await?;
        let definitions = map_items(&envelope.items, "release definition", map_definition);

        info!(
            "Fetching latest release for {} definitions...",
            definitions.len()
        );

        let releases: Vec<Option<(ReleaseDefinition, Value)>> = stream::iter(definitions)
            .map(|definition| async move {
                self.fetch_latest_release(project, &definition)
                    .await
                    .map(|release| release.map(|release| (definition, release)))
            })
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        Ok(releases.into_iter().flatten().collect())
    }

    /// `None` when the definition has no release or its request failed for a
    /// reason other than the credential.
    async fn fetch_latest_release(
        &self,
        project: &str,
        definition: &ReleaseDefinition,
    ) -> Result<Option<Value>> {
        let url = self.client.latest_release_url(project, definition.id);

        match self.client.get_envelope(url).await {
            Ok(envelope) => {
                let release = envelope.items.into_iter().next();
                if release.is_none() {
                    debug!(
                        "Release definition {} ({}) has no releases yet",
                        definition.name, definition.id
                    );
                }
                Ok(release)
            }
            Err(e) if e.is_credential_failure() => Err(e),
            Err(e) => {
                warn!(
                    "Failed to fetch latest release for definition {} ({}): {e}",
                    definition.name, definition.id
                );
                Ok(None)
            }
        }
    }
}
