use log::info;

use super::AzureDevOpsProvider;
use crate::error::Result;
use crate::providers::azure_devops::mappers::{map_items, map_project};
use crate::records::Project;

impl AzureDevOpsProvider {
    /// Lists every project of the organization.
    ///
    /// # Errors
    ///
    /// `ConfigurationMissing` without an organization, `MissingCredential`
    /// without a secret, `RemoteRequestFailed` on a non-success status.
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let organization = self.require_organization()?;
        info!("Fetching projects for organization: {organization}");

        let envelope = self.client.get_envelope(self.client.projects_url()).await?;
        let projects = map_items(&envelope.items, "project", map_project);

        info!("Retrieved {} projects", projects.len());
        Ok(projects)
    }
}
