//! HTTP authorization client.
//!
//! Calls `GET {base_url}{path}?{query_param}={user_key}` and reads the display
//! name from the `data` field of the JSON body.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use roster_core::constants::AUTH_TIMEOUT_SECONDS;
use roster_core::error::{Result, RosterError};
use roster_core::traits::AuthorizationClient;

/// Authorization client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the authorization service
    pub base_url: String,
    /// Lookup path
    pub path: String,
    /// Query parameter carrying the user key
    pub query_param: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl AuthConfig {
    /// Creates config for the given base URL with default path and timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: "/users/auth".into(),
            query_param: "loginId".into(),
            timeout_seconds: AUTH_TIMEOUT_SECONDS,
        }
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Authorization service response body.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    data: Value,
}

impl AuthResponse {
    /// Display name, if the service returned a non-blank one.
    fn display_name(self) -> Option<String> {
        let name = match self.data {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Authorization client backed by an HTTP service.
pub struct HttpAuthorizationClient {
    endpoint: Url,
    query_param: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpAuthorizationClient {
    /// Creates a client with the given config.
    pub fn with_config(config: AuthConfig) -> Result<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| RosterError::Config(format!("invalid authorization URL '{}': {}", config.base_url, e)))?;
        // Keep any path prefix on the base when joining.
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        let endpoint = base
            .join(config.path.trim_start_matches('/'))
            .map_err(|e| RosterError::Config(format!("invalid authorization path '{}': {}", config.path, e)))?;

        let timeout = Duration::from_secs(config.timeout_seconds);
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RosterError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            query_param: config.query_param,
            timeout,
            http_client,
        })
    }

    /// Creates a client for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(AuthConfig::new(base_url))
    }

    /// The lookup endpoint, without the query string.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn lookup_url(&self, user_key: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(&self.query_param, user_key);
        url
    }

    fn map_transport_error(&self, err: reqwest::Error) -> RosterError {
        if err.is_timeout() {
            RosterError::timeout("authorization", self.timeout)
        } else {
            RosterError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl AuthorizationClient for HttpAuthorizationClient {
    #[instrument(skip(self))]
    async fn resolve(&self, user_key: &str) -> Result<Option<String>> {
        let response = self
            .http_client
            .get(self.lookup_url(user_key))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Authorization service returned an error");
            return Err(RosterError::Authorization(format!(
                "lookup failed with status {}: {}",
                status, text
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            debug!("Empty authorization response");
            return Ok(None);
        }

        let parsed: Option<AuthResponse> = serde_json::from_slice(&body)
            .map_err(|e| RosterError::Authorization(format!("malformed response: {}", e)))?;
        let name = parsed.and_then(AuthResponse::display_name);

        debug!(authorized = name.is_some(), "Authorization resolved");
        Ok(name)
    }
}
