//! Network-control API client
//!
//! Implements the tenant-scoped REST API: /v0.1/tenants/{tenant}/networks
//! and the ports and attachments below each network.

use crate::common::{self, HttpClient};
use crate::error::NetCtlError;
use crate::models::*;
use crate::netctl_trait::NetCtlClientTrait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, error, info};

/// Network-control API client
#[derive(Debug, Clone)]
pub struct NetCtlClient {
    http: HttpClient,
}

impl NetCtlClient {
    /// Create a new network-control client
    ///
    /// # Arguments
    /// * `base_url` - Backend base URL (e.g., "http://127.0.0.1:9696")
    /// * `timeout` - Upper bound for every request; an expired timeout
    ///   surfaces as `NetCtlError::Http`
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, NetCtlError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NetCtlError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Create a network owned by `tenant_id`
    ///
    /// # Returns
    /// * `Ok(String)` - The backend id of the new network
    /// * `Err(NetCtlError)` - If the request fails
    pub async fn create_network(&self, tenant_id: &str, name: &str) -> Result<String, NetCtlError> {
        debug!("Creating network {} on tenant {}", name, tenant_id);

        let body = serde_json::to_value(CreateNetworkRequest::new(name))?;
        let created: NetworkEnvelope = self
            .http
            .request_json(Method::POST, tenant_id, &common::networks_path(), Some(&body))
            .await?;

        info!("Created network {} with id {}", name, created.networks.network.id);
        Ok(created.networks.network.id)
    }

    /// Check whether a network exists
    ///
    /// A 404 answer is `Ok(false)`; any other failure is an error.
    pub async fn network_exists(&self, tenant_id: &str, network_id: &str) -> Result<bool, NetCtlError> {
        match self
            .http
            .request(Method::GET, tenant_id, &common::network_path(network_id), None)
            .await
        {
            Ok(_) => Ok(true),
            Err(NetCtlError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Look up a network id by name
    ///
    /// The listing only carries ids, so each network's detail is fetched
    /// until one with a matching name turns up.
    pub async fn get_network_by_name(&self, tenant_id: &str, name: &str) -> Result<Option<String>, NetCtlError> {
        let list: NetworkList = self
            .http
            .request_json(Method::GET, tenant_id, &common::networks_path(), None)
            .await?;

        debug!("(tenant: {}) Looking for network named {} among {}", tenant_id, name, list.networks.len());

        for summary in list.networks {
            let detail: NetworkEnvelope = self
                .http
                .request_json(Method::GET, tenant_id, &common::network_path(&summary.id), None)
                .await?;
            if detail.networks.network.name.as_deref() == Some(name) {
                return Ok(Some(summary.id));
            }
        }

        Ok(None)
    }

    /// Create an active port on a network
    pub async fn create_port(&self, tenant_id: &str, network_id: &str) -> Result<String, NetCtlError> {
        let body = serde_json::to_value(CreatePortRequest::active())?;
        let created: PortEnvelope = self
            .http
            .request_json(Method::POST, tenant_id, &common::ports_path(network_id), Some(&body))
            .await?;

        info!("Created port on network \"{}\" with id: {}", network_id, created.ports.port.id);
        Ok(created.ports.port.id)
    }

    /// Bind an attachment identity to a port
    pub async fn plug_interface(
        &self,
        tenant_id: &str,
        network_id: &str,
        port_id: &str,
        attachment_id: &str,
    ) -> Result<(), NetCtlError> {
        let body = serde_json::to_value(PlugRequest::new(attachment_id))?;
        if let Err(e) = self
            .http
            .request(Method::PUT, tenant_id, &common::attachment_path(network_id, port_id), Some(&body))
            .await
        {
            error!("Failed to plug interface \"{}\" to port \"{}\": {}", attachment_id, port_id, e);
            return Err(e);
        }

        info!("Plugged interface \"{}\" to port {} on network {}", attachment_id, port_id, network_id);
        Ok(())
    }

    /// Remove whatever attachment a port carries
    pub async fn unplug_interface(&self, tenant_id: &str, network_id: &str, port_id: &str) -> Result<(), NetCtlError> {
        if let Err(e) = self
            .http
            .request(Method::DELETE, tenant_id, &common::attachment_path(network_id, port_id), None)
            .await
        {
            error!("Failed to unplug interface from port \"{}\": {}", port_id, e);
            return Err(e);
        }
        Ok(())
    }

    /// Delete a port
    pub async fn delete_port(&self, tenant_id: &str, network_id: &str, port_id: &str) -> Result<(), NetCtlError> {
        self.http
            .request(Method::DELETE, tenant_id, &common::port_path(network_id, port_id), None)
            .await?;
        debug!("Deleted port {} on network {}", port_id, network_id);
        Ok(())
    }

    /// Find the port an attachment identity is plugged into
    ///
    /// The listing only carries port ids, so each port's attachment is read
    /// until one matches.
    pub async fn find_port_by_attachment(
        &self,
        tenant_id: &str,
        network_id: &str,
        attachment_id: &str,
    ) -> Result<Option<String>, NetCtlError> {
        let list: PortList = self
            .http
            .request_json(Method::GET, tenant_id, &common::ports_path(network_id), None)
            .await?;

        for port in list.ports {
            let attachment: AttachmentResponse = self
                .http
                .request_json(Method::GET, tenant_id, &common::attachment_path(network_id, &port.id), None)
                .await?;
            if attachment.attachment.as_deref() == Some(attachment_id) {
                return Ok(Some(port.id));
            }
        }

        Ok(None)
    }
}

#[async_trait::async_trait]
impl NetCtlClientTrait for NetCtlClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn create_network(&self, tenant_id: &str, name: &str) -> Result<String, NetCtlError> {
        self.create_network(tenant_id, name).await
    }

    async fn network_exists(&self, tenant_id: &str, network_id: &str) -> Result<bool, NetCtlError> {
        self.network_exists(tenant_id, network_id).await
    }

    async fn get_network_by_name(&self, tenant_id: &str, name: &str) -> Result<Option<String>, NetCtlError> {
        self.get_network_by_name(tenant_id, name).await
    }

    async fn create_port(&self, tenant_id: &str, network_id: &str) -> Result<String, NetCtlError> {
        self.create_port(tenant_id, network_id).await
    }

    async fn plug_interface(&self, tenant_id: &str, network_id: &str, port_id: &str, attachment_id: &str) -> Result<(), NetCtlError> {
        self.plug_interface(tenant_id, network_id, port_id, attachment_id).await
    }

    async fn unplug_interface(&self, tenant_id: &str, network_id: &str, port_id: &str) -> Result<(), NetCtlError> {
        self.unplug_interface(tenant_id, network_id, port_id).await
    }

    async fn delete_port(&self, tenant_id: &str, network_id: &str, port_id: &str) -> Result<(), NetCtlError> {
        self.delete_port(tenant_id, network_id, port_id).await
    }

    async fn find_port_by_attachment(&self, tenant_id: &str, network_id: &str, attachment_id: &str) -> Result<Option<String>, NetCtlError> {
        self.find_port_by_attachment(tenant_id, network_id, attachment_id).await
    }
}
