use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Missing configuration: {0} is not set")]
    ConfigurationMissing(&'static str),

    #[error("No credential set; provide a personal access token")]
    MissingCredential,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Remote request failed with status {status}: {url}")]
    RemoteRequestFailed { status: u16, url: String },

    #[error("Failed to map {entity}: {reason}")]
    ItemMappingFailed { entity: &'static str, reason: String },

    #[error("Response envelope has no `value` array: {0}")]
    MalformedResponseEnvelope(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub(crate) fn mapping(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::ItemMappingFailed {
            entity,
            reason: reason.into(),
        }
    }

    /// True when the credential is gone or the remote rejected it. Fan-out
    /// fetchers must not absorb these.
    pub fn is_credential_failure(&self) -> bool {
        match self {
            Self::MissingCredential => true,
            Self::RemoteRequestFailed { status, .. } => matches!(status, 401 | 203),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
