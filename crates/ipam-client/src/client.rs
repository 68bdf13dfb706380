//! Address-management API client

use crate::common::{self, HttpClient};
use crate::error::IpamError;
use crate::ipam_trait::IpamClientTrait;
use crate::models::*;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, info};

/// Address-management API client
#[derive(Debug, Clone)]
pub struct IpamClient {
    http: HttpClient,
}

impl IpamClient {
    /// Create a new address-management client
    ///
    /// # Arguments
    /// * `base_url` - Backend base URL (e.g., "http://127.0.0.1:9898")
    /// * `timeout` - Upper bound for every request
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, IpamError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IpamError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Lease addresses to an interface on a network
    ///
    /// The request carries no body unless a MAC address is given.
    pub async fn allocate_ips(
        &self,
        network_id: u64,
        vif_id: u64,
        tenant_id: Option<&str>,
        mac_address: Option<&str>,
    ) -> Result<Vec<IpAddressRecord>, IpamError> {
        let body = mac_address
            .map(|mac| serde_json::to_value(AllocateRequest::with_mac(mac)))
            .transpose()?;
        let list: IpAddressList = self
            .http
            .request_json(
                Method::POST,
                &common::allocations_path(network_id, vif_id, tenant_id),
                body.as_ref(),
            )
            .await?;

        debug!(
            "Allocated {} address(es) for interface {} on network {}",
            list.ip_addresses.len(),
            vif_id,
            network_id
        );
        Ok(list.ip_addresses)
    }

    /// Current allocations of an interface on a network
    pub async fn get_allocated_ips(
        &self,
        network_id: u64,
        vif_id: u64,
        tenant_id: Option<&str>,
    ) -> Result<Vec<IpAddressRecord>, IpamError> {
        let list: IpAddressList = self
            .http
            .request_json(Method::GET, &common::allocations_path(network_id, vif_id, tenant_id), None)
            .await?;
        Ok(list.ip_addresses)
    }

    /// Release every allocation of an interface on a network
    pub async fn deallocate_ips(&self, network_id: u64, vif_id: u64, tenant_id: Option<&str>) -> Result<(), IpamError> {
        self.http
            .request(Method::DELETE, &common::allocations_path(network_id, vif_id, tenant_id), None)
            .await?;
        debug!("Released addresses of interface {} on network {}", vif_id, network_id);
        Ok(())
    }

    /// Register a private block for a network
    pub async fn create_block(
        &self,
        network_id: u64,
        cidr: &str,
        tenant_id: Option<&str>,
        dns1: Option<&str>,
        dns2: Option<&str>,
    ) -> Result<(), IpamError> {
        let body = serde_json::to_value(CreateBlockRequest::private(network_id, cidr, dns1, dns2))?;
        self.http
            .request(Method::POST, &common::blocks_path(tenant_id), Some(&body))
            .await?;
        info!("Registered block {} for network {}", cidr, network_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl IpamClientTrait for IpamClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn allocate_ips(
        &self,
        network_id: u64,
        vif_id: u64,
        tenant_id: Option<&str>,
        mac_address: Option<&str>,
    ) -> Result<Vec<IpAddressRecord>, IpamError> {
        self.allocate_ips(network_id, vif_id, tenant_id, mac_address).await
    }

    async fn get_allocated_ips(&self, network_id: u64, vif_id: u64, tenant_id: Option<&str>) -> Result<Vec<IpAddressRecord>, IpamError> {
        self.get_allocated_ips(network_id, vif_id, tenant_id).await
    }

    async fn deallocate_ips(&self, network_id: u64, vif_id: u64, tenant_id: Option<&str>) -> Result<(), IpamError> {
        self.deallocate_ips(network_id, vif_id, tenant_id).await
    }

    async fn create_block(
        &self,
        network_id: u64,
        cidr: &str,
        tenant_id: Option<&str>,
        dns1: Option<&str>,
        dns2: Option<&str>,
    ) -> Result<(), IpamError> {
        self.create_block(network_id, cidr, tenant_id, dns1, dns2).await
    }
}
