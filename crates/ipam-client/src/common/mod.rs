//! Common utilities for the address-management client
//!
//! Wraps `reqwest::Client` with the `/v0.1/ipam` path layout. Every path
//! can optionally be scoped to a tenant.

use crate::error::IpamError;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

const API_PREFIX: &str = "/v0.1/ipam";

/// HTTP client wrapper for the address-management backend
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for an API path
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a request; only 2xx statuses count as success
    ///
    /// 404 maps to `NotFound`, every other status to `Api`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, IpamError> {
        let url = self.build_url(path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(IpamError::Http)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(IpamError::NotFound(format!("{} {} - {}", method, path, body)));
        }
        Err(IpamError::Api(format!("{} {} failed: {} - {}", method, path, status, body)))
    }

    /// Issue a request and decode the JSON response body
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, IpamError> {
        let response = self.request(method, path, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            IpamError::Api(format!(
                "error decoding response body of {}: {} - Response (first 500 chars): {}",
                path,
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }
}

/// `/v0.1/ipam` or `/v0.1/ipam/tenants/{tenant}`
fn scope(tenant_id: Option<&str>) -> String {
    match tenant_id {
        Some(tenant) => format!("{}/tenants/{}", API_PREFIX, urlencoding::encode(tenant)),
        None => API_PREFIX.to_string(),
    }
}

/// `[/tenants/{t}]/networks/{net}/ports/{vif}/ip_allocations`
pub fn allocations_path(network_id: u64, vif_id: u64, tenant_id: Option<&str>) -> String {
    format!(
        "{}/networks/{}/ports/{}/ip_allocations",
        scope(tenant_id),
        network_id,
        vif_id
    )
}

/// `[/tenants/{t}]/ip_blocks`
pub fn blocks_path(tenant_id: Option<&str>) -> String {
    format!("{}/ip_blocks", scope(tenant_id))
}
