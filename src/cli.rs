use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::Term;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{CredentialEvent, CredentialStore};
use crate::config::{Config, OutputFormat};
use crate::dashboard::DashboardSnapshot;
use crate::error::{DashboardError, Result as DashboardResult};
use crate::output::{self, notice, FetchProgress};
use crate::providers::AzureDevOpsProvider;

#[derive(Parser)]
#[command(name = "azdash")]
#[command(author, version, about = "Azure DevOps Dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./azdash.toml or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Azure DevOps organization
    #[arg(long, global = true, env = "AZURE_DEVOPS_ORG")]
    organization: Option<String>,

    /// Personal access token
    #[arg(short, long, global = true, env = "AZURE_DEVOPS_PAT", hide_env_values = true)]
    token: Option<String>,

    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ProjectArg {
    /// Project name (falls back to the configured project)
    #[arg(short = 'P', long, env = "AZURE_DEVOPS_PROJECT")]
    project: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the projects of the organization
    Projects,
    /// List active pull requests across all repositories
    PullRequests(ProjectArg),
    /// List builds
    Builds(ProjectArg),
    /// List the stages of the latest release of every definition
    ReleaseStages(ProjectArg),
    /// List the latest release of every definition
    Releases(ProjectArg),
    /// Show pull requests, builds and release stages together
    Dashboard {
        #[command(flatten)]
        project: ProjectArg,

        /// Refresh every N seconds until interrupted
        #[arg(short, long)]
        watch: Option<u64>,
    },
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(organization) = &self.organization {
            config.azure_devops.organization = Some(organization.clone());
        }
        if let Some(token) = &self.token {
            config.azure_devops.token = Some(token.clone());
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.pretty {
            config.output.pretty = true;
        }
    }

    /// Token from flags or config, prompting on an interactive terminal.
    fn resolve_token(config: &Config) -> Result<String> {
        if let Some(token) = config.azure_devops.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }

        let term = Term::stderr();
        if !term.is_term() {
            return Err(DashboardError::MissingCredential.into());
        }

        term.write_str("Personal access token: ")?;
        let token = term
            .read_secure_line()
            .context("Failed to read personal access token")?;
        Ok(token.trim().to_string())
    }

    fn project(config: &Config, arg: &ProjectArg) -> String {
        arg.project
            .clone()
            .or_else(|| config.azure_devops.project.clone())
            .unwrap_or_default()
    }

    fn emit<T: Serialize + ?Sized>(
        &self,
        config: &Config,
        value: &T,
        render: impl FnOnce(&T) -> String,
    ) -> Result<()> {
        let mut rendered = Vec::new();
        match config.output.format {
            OutputFormat::Json => output::export_json(value, config.output.pretty, &mut rendered)?,
            OutputFormat::Summary => rendered.extend_from_slice(render(value).as_bytes()),
        }

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, rendered)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Output written to: {}", output_path.display());
        } else {
            print!("{}", String::from_utf8_lossy(&rendered));
        }

        Ok(())
    }

    async fn fetch<T, F>(what: &'static str, fetch: F) -> DashboardResult<Vec<T>>
    where
        F: std::future::Future<Output = DashboardResult<Vec<T>>>,
    {
        let progress = FetchProgress::start(what);
        let result = fetch.await;
        progress.finish(&result);
        result
    }

    async fn run_dashboard(
        &self,
        config: &Config,
        provider: &AzureDevOpsProvider,
        credentials: &CredentialStore,
        project: &str,
        watch: Option<u64>,
    ) -> Result<()> {
        loop {
            let progress = FetchProgress::start("dashboard");
            let snapshot = DashboardSnapshot::collect(provider, project).await;
            progress.complete();

            if watch.is_some() && config.output.format == OutputFormat::Summary {
                Term::stdout().clear_screen()?;
            }
            self.emit(config, &snapshot, output::render_dashboard)?;

            let Some(interval) = watch else {
                return Ok(());
            };

            if credentials.get().is_empty() {
                warn!("Credential cleared, stopping refresh");
                return Ok(());
            }

            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(interval.max(1))) => {}
                _ = tokio::signal::ctrl_c() => return Ok(()),
            }
        }
    }

    async fn run(
        &self,
        config: &Config,
        provider: &AzureDevOpsProvider,
        credentials: &CredentialStore,
    ) -> Result<()> {
        match &self.command {
            Commands::Projects => {
                let projects = Self::fetch("projects", provider.list_projects()).await?;
                self.emit(config, &projects[..], output::render_projects)
            }
            Commands::PullRequests(arg) => {
                let project = Self::project(config, arg);
                let pull_requests =
                    Self::fetch("pull requests", provider.list_pull_requests(&project)).await?;
                self.emit(config, &pull_requests[..], output::render_pull_requests)
            }
            Commands::Builds(arg) => {
                let project = Self::project(config, arg);
                let builds = Self::fetch("builds", provider.list_builds(&project)).await?;
                self.emit(config, &builds[..], output::render_builds)
            }
            Commands::ReleaseStages(arg) => {
                let project = Self::project(config, arg);
                let stages =
                    Self::fetch("release stages", provider.list_release_stages(&project)).await?;
                self.emit(config, &stages[..], output::render_release_stages)
            }
            Commands::Releases(arg) => {
                let project = Self::project(config, arg);
                let releases = Self::fetch("releases", provider.list_releases(&project)).await?;
                self.emit(config, &releases[..], output::render_releases)
            }
            Commands::Dashboard { project, watch } => {
                let project = Self::project(config, project);
                if project.trim().is_empty() {
                    return Err(DashboardError::ConfigurationMissing("project").into());
                }
                self.run_dashboard(config, provider, credentials, &project, *watch)
                    .await
            }
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);

        let organization = config.azure_devops.organization.as_deref().unwrap_or("");
        if organization.trim().is_empty() {
            return Err(DashboardError::ConfigurationMissing("organization"))
                .context("Set --organization, AZURE_DEVOPS_ORG or azure-devops.organization");
        }
        info!("Using Azure DevOps organization: {organization}");

        let credentials = Arc::new(CredentialStore::new());
        credentials
            .set(Self::resolve_token(&config)?)
            .context("A personal access token is required")?;
        let mut cleared = credentials.subscribe();

        let provider = AzureDevOpsProvider::new(&config.azure_devops, Arc::clone(&credentials))?;
        let result = self.run(&config, &provider, &credentials).await;

        if cleared.try_recv() == Ok(CredentialEvent::Cleared) {
            eprintln!(
                "{}",
                notice("Azure DevOps rejected the token. Re-run with a valid --token.")
            );
        }

        result
    }
}
