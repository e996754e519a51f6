mod builds;
mod projects;
mod pull_requests;
mod releases;

use std::sync::Arc;

use crate::auth::CredentialStore;
use crate::config::AzureDevOpsConfig;
use crate::error::{DashboardError, Result};

use super::client::AzureDevOpsClient;
use super::mappers::MappingContext;

/// Azure DevOps dashboard data provider.
///
/// Exposes the read operations consumed by the presentation layer. Each call
/// validates its scope, fetches the top-level list and, where the API needs
/// it, fans out to one sub-request per repository or release definition.
/// Sub-requests run with at most `max_concurrent_requests` in flight and
/// results keep the order of the parent list.
pub struct AzureDevOpsProvider {
    client: AzureDevOpsClient,
    max_concurrent_requests: usize,
}

impl AzureDevOpsProvider {
    /// Creates a provider for the organization named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a base URL is invalid or the HTTP client cannot be
    /// built. A missing organization is only reported when an operation runs.
    pub fn new(config: &AzureDevOpsConfig, credentials: Arc<CredentialStore>) -> Result<Self> {
        Ok(Self {
            client: AzureDevOpsClient::new(config, credentials)?,
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        })
    }

    pub fn organization(&self) -> &str {
        &self.client.organization
    }

    fn require_organization(&self) -> Result<&str> {
        let organization = self.organization();
        if organization.trim().is_empty() {
            return Err(DashboardError::ConfigurationMissing("organization"));
        }
        Ok(organization)
    }

    /// Validates organization and project before any request is issued.
    fn scope<'a>(&'a self, project: &'a str) -> Result<MappingContext<'a>> {
        let organization = self.require_organization()?;
        if project.trim().is_empty() {
            return Err(DashboardError::ConfigurationMissing("project"));
        }

        Ok(MappingContext {
            web_url: &self.client.base_url,
            organization,
            project,
        })
    }
}
