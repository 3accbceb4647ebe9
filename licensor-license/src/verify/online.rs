//! Online verification: the remote authority decides.
//!
//! One `POST <api_url>/license/verify/online` with `{device_id, app_id}`. The
//! server's [`VerifyResult`] is returned as-is; expiry and device logic live
//! on the server.

use crate::error::{LicenseError, LicenseResult, VerifyError, VerifyOutcome};
use crate::license::VerifyResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Request timeout in milliseconds when none is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Path appended to [`OnlineConfig::api_url`].
pub const VERIFY_ONLINE_PATH: &str = "/license/verify/online";

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Where and how to reach the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineConfig {
    /// Base URL, e.g. `https://licenses.example.com/api/v1`.
    pub api_url: String,
    /// Application id sent with every request.
    pub app_id: String,
    /// Whole-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra attempts after a transport failure. Zero means no retry.
    #[serde(default)]
    pub retries: u32,
    /// Bearer token presented to the server, if it enforces one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl OnlineConfig {
    pub fn new(api_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            app_id: app_id.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: 0,
            api_token: None,
        }
    }

    /// Sets the whole-request timeout. Millisecond precision; anything below
    /// one millisecond becomes one millisecond.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Full URL of the verification endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{VERIFY_ONLINE_PATH}", self.api_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct OnlineRequest<'a> {
    device_id: &'a str,
    app_id: &'a str,
}

/// Verifies a device against the remote authority.
#[derive(Debug, Clone)]
pub struct OnlineVerifier {
    config: OnlineConfig,
    client: reqwest::Client,
}

impl OnlineVerifier {
    /// # Errors
    /// [`LicenseError::Network`] if the HTTP client cannot be built.
    pub fn new(config: OnlineConfig) -> LicenseResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LicenseError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OnlineConfig {
        &self.config
    }

    /// Asks the remote authority about `device_id`.
    ///
    /// # Errors
    /// [`LicenseError::Network`] on transport failure or timeout, a
    /// non-success status, or an undecodable body.
    pub async fn verify(&self, device_id: &str) -> VerifyOutcome {
        let url = self.config.endpoint();
        let body = OnlineRequest {
            device_id,
            app_id: &self.config.app_id,
        };

        let mut attempt: u32 = 0;
        let response = loop {
            let mut request = self.client.post(&url).json(&body);
            if let Some(token) = &self.config.api_token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) => break response,
                Err(e) if attempt < self.config.retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "online verification request failed, retrying");
                }
                Err(e) => {
                    warn!(error = %e, "online verification request failed");
                    return Err(network(format!("request to {url} failed: {e}")));
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "online verification rejected by server");
            return Err(network(format!("server responded with {status}")));
        }

        let result: VerifyResult = response
            .json()
            .await
            .map_err(|e| network(format!("undecodable response: {e}")))?;

        debug!(valid = result.valid, expired = result.expired, "online verification answered");
        Ok(result)
    }
}

fn network(message: String) -> VerifyError {
    VerifyError::bare(LicenseError::Network(message))
}
