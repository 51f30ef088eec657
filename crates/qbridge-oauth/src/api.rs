//! Authenticated client for the QuickBooks Online accounting API.
//!
//! Every request carries the tenant's bearer token. A 401 triggers exactly one
//! refresh grant followed by exactly one retry.

use reqwest::{Client, StatusCode, header};

use crate::broker::SharedAuthBroker;
use crate::error::{OAuthError, Result};

/// Production API base URL.
pub const PRODUCTION_API_BASE: &str = "https://quickbooks.api.intuit.com/v3/company";

/// Sandbox API base URL.
pub const SANDBOX_API_BASE: &str = "https://sandbox-quickbooks.api.intuit.com/v3/company";

/// API minor version sent with every request.
pub const DEFAULT_MINOR_VERSION: &str = "75";

/// Remote API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub minor_version: Option<String>,
}

impl ApiConfig {
    /// Config for the production environment.
    pub fn production() -> Self {
        Self::with_base_url(PRODUCTION_API_BASE)
    }

    /// Config for the sandbox environment.
    pub fn sandbox() -> Self {
        Self::with_base_url(SANDBOX_API_BASE)
    }

    /// Config for an arbitrary base URL (e.g. a mock server).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            minor_version: Some(DEFAULT_MINOR_VERSION.to_string()),
        }
    }

    /// Set or clear the minor version parameter.
    pub fn with_minor_version(mut self, minor_version: Option<String>) -> Self {
        self.minor_version = minor_version;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// Client for tenant-scoped GET requests with refresh-on-401.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    broker: SharedAuthBroker,
}

impl ApiClient {
    pub fn new(http: Client, config: ApiConfig, broker: SharedAuthBroker) -> Self {
        Self {
            http,
            config,
            broker,
        }
    }

    /// The API configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The authorization broker backing this client.
    pub fn broker(&self) -> &SharedAuthBroker {
        &self.broker
    }

    /// GET `{base}/{tenant}/{path}` and parse the JSON body.
    ///
    /// Fails with [`OAuthError::NotAuthorized`] when the tenant has no tokens,
    /// [`OAuthError::RefreshFailed`] when the single refresh attempt is
    /// rejected, and [`OAuthError::RemoteApi`] for any other non-success
    /// status, including a 401 on the retried request.
    pub async fn get(
        &self,
        tenant_id: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let url = self.url(tenant_id, path);
        let access_token = self.broker.access_token(tenant_id).await?;

        let mut response = self.send(&url, query, &access_token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(tenant_id = %tenant_id, "Access token rejected, refreshing");
            let access_token = self.broker.refresh(tenant_id).await?;
            response = self.send(&url, query, &access_token).await?;
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::Network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(OAuthError::RemoteApi {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| OAuthError::Serialization(format!("Failed to parse response: {}", e)))
    }

    fn url(&self, tenant_id: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(tenant_id),
            path.trim_start_matches('/')
        )
    }

    async fn send(
        &self,
        url: &str,
        query: &[(&str, &str)],
        access_token: &str,
    ) -> Result<reqwest::Response> {
        let mut req = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(header::ACCEPT, "application/json")
            .query(query);

        if let Some(minor) = &self.config.minor_version {
            req = req.query(&[("minorversion", minor.as_str())]);
        }

        tracing::debug!(url = %url, "Calling accounting API");
        req.send()
            .await
            .map_err(|e| OAuthError::Network(format!("API request failed: {}", e)))
    }
}
