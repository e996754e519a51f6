use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use crate::auth::CredentialStore;
use crate::config::AzureDevOpsConfig;
use crate::error::{DashboardError, Result};

const USER_AGENT: &str = "AzDash/1.0";
const PREVIEW_CHARS: usize = 200;

/// HTTP side of the Azure DevOps integration.
///
/// Owns the base URL templates and attaches the current credential to every
/// request. Holds no state between calls besides the shared credential store.
pub struct AzureDevOpsClient {
    client: Client,
    pub(crate) base_url: Url,
    pub(crate) release_url: Url,
    pub(crate) organization: String,
    pub(super) api_version: String,
    pub(super) release_api_version: String,
    credentials: Arc<CredentialStore>,
}

/// A list response: `{"count": n, "value": [...]}`.
#[derive(Debug, Default)]
pub struct Envelope {
    pub count: Option<u64>,
    pub items: Vec<Value>,
}

impl Envelope {
    /// Parses a list response body.
    ///
    /// # Errors
    ///
    /// `Json` if the body is not JSON, `MalformedResponseEnvelope` if it has no
    /// `value` array.
    pub fn parse(body: &str) -> Result<Self> {
        let mut root: Value = serde_json::from_str(body)?;

        let count = root.get("count").and_then(Value::as_u64);
        match root.get_mut("value").map(Value::take) {
            Some(Value::Array(items)) => Ok(Self { count, items }),
            _ => Err(DashboardError::MalformedResponseEnvelope(preview(body))),
        }
    }
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

fn parse_base(raw: &str, name: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| DashboardError::Config(format!("Invalid {name}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(DashboardError::Config(format!(
            "Invalid {name}: {raw} cannot be used as a base URL"
        )));
    }
    Ok(url)
}

impl AzureDevOpsClient {
    pub fn new(config: &AzureDevOpsConfig, credentials: Arc<CredentialStore>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: parse_base(&config.base_url, "base URL")?,
            release_url: parse_base(&config.release_url, "release URL")?,
            organization: config.organization.clone().unwrap_or_default(),
            api_version: config.api_version.clone(),
            release_api_version: config.release_api_version.clone(),
            credentials,
        })
    }

    /// Attaches Basic auth with an empty user name and the secret as password.
    ///
    /// # Errors
    ///
    /// `MissingCredential` when no secret is set.
    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let token = self
            .credentials
            .current()
            .ok_or(DashboardError::MissingCredential)?;
        Ok(request.basic_auth("", Some(token.as_str())))
    }

    /// Issues a GET against a list endpoint and decodes its envelope.
    ///
    /// A body without a `value` array is logged and treated as an empty list.
    /// An authentication rejection clears the stored credential so listeners
    /// can prompt for a new one.
    ///
    /// # Errors
    ///
    /// `RemoteRequestFailed` for any non-success status, `Network` and `Json`
    /// for transport and decoding faults.
    pub async fn get_envelope(&self, url: Url) -> Result<Envelope> {
        debug!("Requesting URL: {url}");

        let response = self
            .auth_request(self.client.get(url.clone()))?
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Response status {status}, preview: {}", preview(&body));

        // A rejected PAT is answered with 203 and an HTML sign-in page.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::NON_AUTHORITATIVE_INFORMATION
        {
            warn!("Credential rejected by {} (status {status})", url.host_str().unwrap_or(""));
            self.credentials.clear();
            return Err(DashboardError::RemoteRequestFailed {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(DashboardError::RemoteRequestFailed {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        match Envelope::parse(&body) {
            Ok(envelope) => {
                if let Some(count) = envelope.count {
                    if count != envelope.items.len() as u64 {
                        debug!("Envelope count {count} differs from {} items", envelope.items.len());
                    }
                }
                Ok(envelope)
            }
            Err(e @ DashboardError::MalformedResponseEnvelope(_)) => {
                warn!("Treating response from {url} as empty: {e}");
                Ok(Envelope::default())
            }
            result => result,
        }
    }
}
