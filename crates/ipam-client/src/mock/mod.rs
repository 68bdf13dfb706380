//! Mock IpamClient for unit testing
//!
//! In-memory implementation of `IpamClientTrait`. Blocks registered for a
//! network hand out consecutive host addresses starting at offset 2; every
//! call is recorded so tests can pair allocations with releases.

use crate::error::IpamError;
use crate::ipam_trait::IpamClientTrait;
use crate::models::{IpAddressRecord, IpBlockRef};
use ipnet::IpNet;
use std::collections::{BTreeMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};

/// First host offset handed out; offset 1 is the gateway
const FIRST_HOST_OFFSET: u128 = 2;

/// A call made against the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpamCall {
    Allocate { network_id: u64, vif_id: u64, tenant_id: Option<String>, mac_address: Option<String> },
    GetAllocated { network_id: u64, vif_id: u64, tenant_id: Option<String> },
    Deallocate { network_id: u64, vif_id: u64, tenant_id: Option<String> },
    CreateBlock { network_id: u64, cidr: String, tenant_id: Option<String>, dns1: Option<String>, dns2: Option<String> },
}

#[derive(Debug, Clone)]
struct MockBlock {
    cidr: IpNet,
    dns1: Option<String>,
    dns2: Option<String>,
    next_offset: u128,
}

type AllocationKey = (u64, u64, Option<String>);

/// Mock IpamClient for testing
#[derive(Debug, Clone)]
pub struct MockIpamClient {
    base_url: String,
    blocks: Arc<Mutex<BTreeMap<u64, Vec<MockBlock>>>>,
    allocations: Arc<Mutex<BTreeMap<AllocationKey, Vec<IpAddressRecord>>>>,
    canned: Arc<Mutex<BTreeMap<u64, Vec<IpAddressRecord>>>>,
    calls: Arc<Mutex<Vec<IpamCall>>>,
    failing_networks: Arc<Mutex<HashSet<u64>>>,
    failing_reads: Arc<Mutex<u32>>,
}

impl MockIpamClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blocks: Arc::new(Mutex::new(BTreeMap::new())),
            allocations: Arc::new(Mutex::new(BTreeMap::new())),
            canned: Arc::new(Mutex::new(BTreeMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing_networks: Arc::new(Mutex::new(HashSet::new())),
            failing_reads: Arc::new(Mutex::new(0)),
        }
    }

    /// Register a block without recording a call (for test setup)
    pub fn add_block(&self, network_id: u64, cidr: &str) {
        if let Ok(cidr) = cidr.parse::<IpNet>() {
            self.insert_block(network_id, cidr, None, None);
        }
    }

    /// Answer every allocation on `network_id` with exactly these records
    pub fn set_allocation_response(&self, network_id: u64, records: Vec<IpAddressRecord>) {
        self.canned.lock().unwrap().insert(network_id, records);
    }

    /// Make every allocation on `network_id` fail with an API error
    pub fn fail_network(&self, network_id: u64) {
        self.failing_networks.lock().unwrap().insert(network_id);
    }

    /// Make the next `count` allocation reads fail with an API error
    pub fn fail_next_reads(&self, count: u32) {
        *self.failing_reads.lock().unwrap() = count;
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<IpamCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Forget recorded calls (state is kept)
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Number of (network, interface, tenant) scopes still holding addresses
    pub fn live_allocation_count(&self) -> usize {
        self.allocations.lock().unwrap().len()
    }

    /// Blocks registered for a network, as CIDR strings
    pub fn blocks_of(&self, network_id: u64) -> Vec<String> {
        self.blocks
            .lock()
            .unwrap()
            .get(&network_id)
            .map(|blocks| blocks.iter().map(|b| b.cidr.to_string()).collect())
            .unwrap_or_default()
    }

    fn insert_block(&self, network_id: u64, cidr: IpNet, dns1: Option<String>, dns2: Option<String>) {
        self.blocks.lock().unwrap().entry(network_id).or_default().push(MockBlock {
            cidr,
            dns1,
            dns2,
            next_offset: FIRST_HOST_OFFSET,
        });
    }

    fn record(&self, call: IpamCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_read(&self) -> Result<(), IpamError> {
        let mut remaining = self.failing_reads.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(IpamError::Api("injected transient read failure".to_string()));
        }
        Ok(())
    }

    fn lease_from_blocks(&self, network_id: u64) -> Result<Vec<IpAddressRecord>, IpamError> {
        let mut blocks = self.blocks.lock().unwrap();
        let blocks = blocks
            .get_mut(&network_id)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| IpamError::NotFound(format!("No blocks for network {}", network_id)))?;

        blocks
            .iter_mut()
            .map(|block| -> Result<IpAddressRecord, IpamError> {
                let record = block_record(block, block.next_offset)?;
                block.next_offset += 1;
                Ok(record)
            })
            .collect()
    }
}

fn offset(cidr: &IpNet, offset: u128) -> Option<IpAddr> {
    match cidr {
        IpNet::V4(net) => {
            let base = u32::from(net.network()) as u128;
            let addr = u32::try_from(base + offset).ok()?;
            let addr = Ipv4Addr::from(addr);
            net.contains(&addr).then_some(IpAddr::V4(addr))
        }
        IpNet::V6(net) => {
            let addr = Ipv6Addr::from(u128::from(net.network()).checked_add(offset)?);
            net.contains(&addr).then_some(IpAddr::V6(addr))
        }
    }
}

fn block_record(block: &MockBlock, host_offset: u128) -> Result<IpAddressRecord, IpamError> {
    let address = offset(&block.cidr, host_offset)
        .ok_or_else(|| IpamError::Api(format!("Block {} exhausted", block.cidr)))?;
    let (version, netmask, broadcast) = match &block.cidr {
        IpNet::V4(net) => (4, net.netmask().to_string(), Some(net.broadcast().to_string())),
        IpNet::V6(net) => (6, net.prefix_len().to_string(), None),
    };

    Ok(IpAddressRecord {
        id: Some(format!("addr-{}", address)),
        address: address.to_string(),
        version,
        ip_block: IpBlockRef {
            cidr: block.cidr.to_string(),
            netmask: Some(netmask),
            gateway: offset(&block.cidr, 1).map(|g| g.to_string()),
            broadcast,
            dns1: block.dns1.clone(),
            dns2: block.dns2.clone(),
        },
    })
}

#[async_trait::async_trait]
impl IpamClientTrait for MockIpamClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn allocate_ips(
        &self,
        network_id: u64,
        vif_id: u64,
        tenant_id: Option<&str>,
        mac_address: Option<&str>,
    ) -> Result<Vec<IpAddressRecord>, IpamError> {
        self.record(IpamCall::Allocate {
            network_id,
            vif_id,
            tenant_id: tenant_id.map(str::to_string),
            mac_address: mac_address.map(str::to_string),
        });
        if self.failing_networks.lock().unwrap().contains(&network_id) {
            return Err(IpamError::Api(format!("injected failure on network {}", network_id)));
        }

        let canned = self.canned.lock().unwrap().get(&network_id).cloned();
        let records = match canned {
            Some(records) => records,
            None => self.lease_from_blocks(network_id)?,
        };

        self.allocations
            .lock()
            .unwrap()
            .entry((network_id, vif_id, tenant_id.map(str::to_string)))
            .or_default()
            .extend(records.iter().cloned());
        Ok(records)
    }

    async fn get_allocated_ips(&self, network_id: u64, vif_id: u64, tenant_id: Option<&str>) -> Result<Vec<IpAddressRecord>, IpamError> {
        self.record(IpamCall::GetAllocated {
            network_id,
            vif_id,
            tenant_id: tenant_id.map(str::to_string),
        });
        self.check_read()?;
        Ok(self
            .allocations
            .lock()
            .unwrap()
            .get(&(network_id, vif_id, tenant_id.map(str::to_string)))
            .cloned()
            .unwrap_or_default())
    }

    async fn deallocate_ips(&self, network_id: u64, vif_id: u64, tenant_id: Option<&str>) -> Result<(), IpamError> {
        self.record(IpamCall::Deallocate {
            network_id,
            vif_id,
            tenant_id: tenant_id.map(str::to_string),
        });
        self.allocations
            .lock()
            .unwrap()
            .remove(&(network_id, vif_id, tenant_id.map(str::to_string)));
        Ok(())
    }

    async fn create_block(
        &self,
        network_id: u64,
        cidr: &str,
        tenant_id: Option<&str>,
        dns1: Option<&str>,
        dns2: Option<&str>,
    ) -> Result<(), IpamError> {
        self.record(IpamCall::CreateBlock {
            network_id,
            cidr: cidr.to_string(),
            tenant_id: tenant_id.map(str::to_string),
            dns1: dns1.map(str::to_string),
            dns2: dns2.map(str::to_string),
        });
        let parsed: IpNet = cidr
            .parse()
            .map_err(|e| IpamError::Api(format!("invalid cidr {}: {}", cidr, e)))?;
        self.insert_block(network_id, parsed, dns1.map(str::to_string), dns2.map(str::to_string));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_hands_out_consecutive_hosts() {
        let mock = MockIpamClient::new("http://test-ipam");
        mock.add_block(1, "10.1.1.0/24");

        let first = mock.allocate_ips(1, 10, Some("t1"), None).await.unwrap();
        let second = mock.allocate_ips(1, 11, Some("t1"), None).await.unwrap();

        assert_eq!(first[0].address, "10.1.1.2");
        assert_eq!(first[0].ip_block.gateway.as_deref(), Some("10.1.1.1"));
        assert_eq!(first[0].ip_block.netmask.as_deref(), Some("255.255.255.0"));
        assert_eq!(first[0].ip_block.broadcast.as_deref(), Some("10.1.1.255"));
        assert_eq!(second[0].address, "10.1.1.3");
    }

    #[tokio::test]
    async fn test_v6_block_uses_prefix_as_netmask() {
        let mock = MockIpamClient::new("http://test-ipam");
        mock.create_block(1, "10.1.1.0/24", None, None, None).await.unwrap();
        mock.create_block(1, "fe::/64", None, None, None).await.unwrap();

        let records = mock.allocate_ips(1, 10, None, None).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].address, "fe::2");
        assert_eq!(records[1].version, 6);
        assert_eq!(records[1].ip_block.netmask.as_deref(), Some("64"));
        assert_eq!(records[1].ip_block.gateway.as_deref(), Some("fe::1"));
    }

    #[tokio::test]
    async fn test_allocate_without_blocks_fails() {
        let mock = MockIpamClient::new("http://test-ipam");
        let result = mock.allocate_ips(5, 1, None, None).await;
        assert!(matches!(result, Err(IpamError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_allocations_are_scoped_by_tenant() {
        let mock = MockIpamClient::new("http://test-ipam");
        mock.add_block(1, "10.1.1.0/24");
        mock.allocate_ips(1, 10, Some("t1"), None).await.unwrap();

        assert_eq!(mock.get_allocated_ips(1, 10, Some("t1")).await.unwrap().len(), 1);
        assert!(mock.get_allocated_ips(1, 10, None).await.unwrap().is_empty());

        mock.deallocate_ips(1, 10, Some("t1")).await.unwrap();
        assert_eq!(mock.live_allocation_count(), 0);
    }
}
