//! IpamClient trait for mocking
//!
//! This trait abstracts the address-management client so the provisioner
//! can be exercised against an in-memory backend in unit tests.

use crate::error::IpamError;
use crate::models::IpAddressRecord;

/// Trait for address-management backend operations
///
/// `tenant_id` of `None` issues the unscoped form of each call.
#[async_trait::async_trait]
pub trait IpamClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    // Allocations
    async fn allocate_ips(
        &self,
        network_id: u64,
        vif_id: u64,
        tenant_id: Option<&str>,
        mac_address: Option<&str>,
    ) -> Result<Vec<IpAddressRecord>, IpamError>;
    async fn get_allocated_ips(&self, network_id: u64, vif_id: u64, tenant_id: Option<&str>) -> Result<Vec<IpAddressRecord>, IpamError>;
    async fn deallocate_ips(&self, network_id: u64, vif_id: u64, tenant_id: Option<&str>) -> Result<(), IpamError>;

    // Blocks
    async fn create_block(
        &self,
        network_id: u64,
        cidr: &str,
        tenant_id: Option<&str>,
        dns1: Option<&str>,
        dns2: Option<&str>,
    ) -> Result<(), IpamError>;
}
