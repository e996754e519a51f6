use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for azdash.
///
/// Every value can also be supplied on the command line; flags win over the
/// file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub azure_devops: AzureDevOpsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureDevOpsConfig {
    /// Organization name (the `{org}` in `dev.azure.com/{org}`)
    pub organization: Option<String>,

    /// Default project used when a command does not name one
    pub project: Option<String>,

    /// Personal access token
    pub token: Option<String>,

    /// Host serving the core, git and build APIs
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Host serving the release management APIs
    #[serde(default = "default_release_url")]
    pub release_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_release_api_version")]
    pub release_api_version: String,

    /// Upper bound on in-flight per-repository / per-definition requests
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            organization: None,
            project: None,
            token: None,
            base_url: default_base_url(),
            release_url: default_release_url(),
            api_version: default_api_version(),
            release_api_version: default_release_api_version(),
            max_concurrent_requests: default_max_concurrent_requests(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_base_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_release_url() -> String {
    "https://vsrm.dev.azure.com".to_string()
}

fn default_api_version() -> String {
    "7.0".to_string()
}

fn default_release_api_version() -> String {
    "6.0".to_string()
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./azdash.toml, ./azdash.json, ./azdash.yaml, ./azdash.yml
    /// 3. `<config dir>/azdash/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["azdash.toml", "azdash.json", "azdash.yaml", "azdash.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load_from_path(&path);
        }

        Ok(Self::default())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("azdash").join("config.toml"))
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
