//! Test utilities for unit testing the provisioner
//!
//! Builds network and interface records and wires a `Provisioner` to the
//! in-memory store and the mock backends.

#[cfg(test)]
use crate::config::ProvisionerConfig;
#[cfg(test)]
use crate::provisioner::Provisioner;
#[cfg(test)]
use crate::store::{MemoryStore, NetworkStore};
#[cfg(test)]
use chrono::Utc;
#[cfg(test)]
use ipam_client::MockIpamClient;
#[cfg(test)]
use ipnet::Ipv4Net;
#[cfg(test)]
use netctl_client::MockNetCtlClient;
#[cfg(test)]
use netmodel::{AttachmentId, Network, NewNetwork, VirtualInterface};
#[cfg(test)]
use std::net::Ipv4Addr;
#[cfg(test)]
use std::sync::Arc;

/// Network record with a /24 derived from its id (10.<id>.0.0/24)
#[cfg(test)]
pub fn test_network(id: u64, label: &str, tenant_id: Option<&str>, priority: Option<u32>) -> Network {
    let cidr = Ipv4Net::new(Ipv4Addr::new(10, (id % 256) as u8, 0, 0), 24).unwrap();
    let mut network = NewNetwork::from_block(label, cidr).into_network(id, Utc::now());
    network.tenant_id = tenant_id.map(|t| t.to_string());
    network.priority = priority;
    network
}

/// Interface record with a fixed locally administered MAC
#[cfg(test)]
pub fn test_vif(id: u64, instance_id: &str, network_id: u64) -> VirtualInterface {
    VirtualInterface {
        id,
        instance_id: instance_id.to_string(),
        network_id,
        mac_address: format!("02:16:3e:00:00:{:02x}", id % 256),
        attachment: AttachmentId::new(instance_id, network_id),
        created_at: Utc::now(),
    }
}

/// Defaults with retries that do not sleep
#[cfg(test)]
pub fn test_config() -> ProvisionerConfig {
    ProvisionerConfig {
        read_retry_backoff_ms: 0,
        ..Default::default()
    }
}

/// A provisioner plus handles on its store and mock backends
#[cfg(test)]
pub struct TestHarness {
    pub provisioner: Provisioner,
    pub store: Arc<MemoryStore>,
    pub netctl: MockNetCtlClient,
    pub ipam: MockIpamClient,
}

#[cfg(test)]
pub fn harness(config: ProvisionerConfig) -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let netctl = MockNetCtlClient::new("http://test-netctl");
    let ipam = MockIpamClient::new("http://test-ipam");
    let provisioner = Provisioner::new(
        store.clone() as Arc<dyn NetworkStore>,
        Box::new(netctl.clone()),
        Box::new(ipam.clone()),
        config,
    );
    TestHarness {
        provisioner,
        store,
        netctl,
        ipam,
    }
}

#[cfg(test)]
impl TestHarness {
    /// Insert a network that already exists on both backends
    pub async fn seed_network(&self, label: &str, tenant_id: Option<&str>, priority: Option<u32>, cidr: &str) -> Network {
        let mut new = NewNetwork::from_block(label, cidr.parse().unwrap());
        new.tenant_id = tenant_id.map(|t| t.to_string());
        new.priority = priority;
        new.backend_handle = Some(format!("netctl-{}", label));

        let network = self.store.create_network_safe(new).await.unwrap().unwrap();
        let tenant = tenant_id.unwrap_or(&self.provisioner.config.default_tenant);
        self.netctl
            .add_network(tenant, network.backend_handle.as_deref().unwrap(), label);
        self.ipam.add_block(network.id, cidr);
        network
    }
}
