//! Common utilities for the network-control client
//!
//! Wraps `reqwest::Client` with the backend's tenant-scoped path layout
//! and its status-code conventions.

use crate::error::NetCtlError;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Every action lives under this tenant-scoped prefix
const ACTION_PREFIX: &str = "/v0.1/tenants";

/// Resource representation suffix
pub const FORMAT: &str = "json";

/// HTTP client wrapper for the network-control backend
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

    /// Build the full URL of a tenant-scoped action
    ///
    /// `action` is the path below the tenant, e.g. `/networks/abc.json`.
    pub fn build_url(&self, tenant_id: &str, action: &str) -> String {
        format!(
            "{}{}/{}{}",
            self.base_url,
            ACTION_PREFIX,
            urlencoding::encode(tenant_id),
            action
        )
    }

    /// Issue a request and return the response when the backend accepted it
    ///
    /// 200, 201, 202 and 204 count as success. 404 maps to `NotFound`, every
    /// other status to `Api`.
    pub async fn request(
        &self,
        method: Method,
        tenant_id: &str,
        action: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, NetCtlError> {
        let url = self.build_url(tenant_id, action);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.header("Content-Type", "application/json").json(body);
        }

        let response = request.send().await.map_err(NetCtlError::Http)?;

        let status = response.status();
        if is_accepted(status) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(NetCtlError::NotFound(format!("{} {} - {}", method, action, body)));
        }
        Err(NetCtlError::Api(format!(
            "{} {} failed: {} - {}",
            method, action, status, body
        )))
    }

    /// Issue a request and decode the JSON response body
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        tenant_id: &str,
        action: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, NetCtlError> {
        let response = self.request(method, tenant_id, action, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            NetCtlError::Api(format!(
                "error decoding response body of {}: {} - Response (first 500 chars): {}",
                action,
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }
}

/// Statuses the backend uses for a successful call
pub fn is_accepted(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT
    )
}

/// `/networks.json`
pub fn networks_path() -> String {
    format!("/networks.{}", FORMAT)
}

/// `/networks/{id}.json`
pub fn network_path(network_id: &str) -> String {
    format!("/networks/{}.{}", urlencoding::encode(network_id), FORMAT)
}

/// `/networks/{id}/ports.json`
pub fn ports_path(network_id: &str) -> String {
    format!("/networks/{}/ports.{}", urlencoding::encode(network_id), FORMAT)
}

/// `/networks/{id}/ports/{port}.json`
pub fn port_path(network_id: &str, port_id: &str) -> String {
    format!(
        "/networks/{}/ports/{}.{}",
        urlencoding::encode(network_id),
        urlencoding::encode(port_id),
        FORMAT
    )
}

/// `/networks/{id}/ports/{port}/attachment.json`
pub fn attachment_path(network_id: &str, port_id: &str) -> String {
    format!(
        "/networks/{}/ports/{}/attachment.{}",
        urlencoding::encode(network_id),
        urlencoding::encode(port_id),
        FORMAT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_scopes_by_tenant() {
        let http = HttpClient::new(Client::new(), "http://127.0.0.1:9696/".to_string());
        assert_eq!(
            http.build_url("project1", &networks_path()),
            "http://127.0.0.1:9696/v0.1/tenants/project1/networks.json"
        );
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(network_path("n1"), "/networks/n1.json");
        assert_eq!(ports_path("n1"), "/networks/n1/ports.json");
        assert_eq!(port_path("n1", "p1"), "/networks/n1/ports/p1.json");
        assert_eq!(attachment_path("n1", "p1"), "/networks/n1/ports/p1/attachment.json");
    }

    #[test]
    fn test_accepted_statuses() {
        assert!(is_accepted(StatusCode::OK));
        assert!(is_accepted(StatusCode::ACCEPTED));
        assert!(is_accepted(StatusCode::NO_CONTENT));
        assert!(!is_accepted(StatusCode::NOT_FOUND));
        assert!(!is_accepted(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
