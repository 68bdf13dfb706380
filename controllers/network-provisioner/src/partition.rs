//! Subnet partitioning
//!
//! Splits a parent address block into equally sized, consecutive subnets
//! and derives the per-subnet addressing (gateway, broadcast, DHCP start,
//! VPN and VLAN settings). Pure: no I/O.

use crate::error::ProvisionError;
use ipnet::{Ipv4Net, Ipv6Net};
use netmodel::NewNetwork;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// v6 subnets are always /64, whatever the v4 size
pub const V6_SUBNET_PREFIX: u8 = 64;

/// Smallest subnet that still fits network, gateway, DHCP start and broadcast
pub const MIN_NETWORK_SIZE: u32 = 4;

/// VLAN-manager style settings: one VLAN and one VPN port per subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnSettings {
    pub vlan_start: u16,
    pub vpn_start: u16,
}

/// Input of a network-creation batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRequest {
    pub label: String,
    pub cidr: Ipv4Net,
    pub num_networks: u32,
    /// Addresses per subnet; must be a power of two
    pub network_size: u32,
    #[serde(default)]
    pub cidr_v6: Option<Ipv6Net>,
    #[serde(default)]
    pub gateway_v6: Option<Ipv6Addr>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub multi_host: bool,
    #[serde(default)]
    pub bridge: Option<String>,
    #[serde(default)]
    pub bridge_interface: Option<String>,
    #[serde(default)]
    pub dns1: Option<IpAddr>,
    #[serde(default)]
    pub dns2: Option<IpAddr>,
    #[serde(default)]
    pub vpn: Option<VpnSettings>,
}

/// One computed subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetPlan {
    pub index: u32,
    pub network: NewNetwork,
}

impl SubnetPlan {
    /// v6 netmask as a prefix length ("64")
    pub fn netmask_v6(&self) -> Option<String> {
        self.network.cidr_v6.map(|net| net.prefix_len().to_string())
    }
}

/// Compute every subnet of a batch
///
/// The v6 block is only used when `use_ipv6` is set, and is then required.
pub fn partition(request: &PartitionRequest, use_ipv6: bool) -> Result<Vec<SubnetPlan>, ProvisionError> {
    let prefix = subnet_prefix(request)?;
    let parent_v6 = if use_ipv6 {
        Some(request.cidr_v6.ok_or_else(|| {
            ProvisionError::Validation("IPv6 is enabled but no v6 block was given".to_string())
        })?)
    } else {
        None
    };

    (0..request.num_networks)
        .map(|index| -> Result<SubnetPlan, ProvisionError> {
            let cidr = v4_subnet(&request.cidr, prefix, request.network_size, index)?;
            let cidr_v6 = parent_v6.map(|parent| v6_subnet(&parent, index)).transpose()?;
            Ok(SubnetPlan {
                index,
                network: build_network(request, index, cidr, cidr_v6)?,
            })
        })
        .collect()
}

fn subnet_prefix(request: &PartitionRequest) -> Result<u8, ProvisionError> {
    let size = request.network_size;
    if !size.is_power_of_two() {
        return Err(ProvisionError::Validation(format!(
            "network size {} is not a power of two",
            size
        )));
    }
    if size < MIN_NETWORK_SIZE {
        return Err(ProvisionError::Validation(format!(
            "network size {} is smaller than {}",
            size, MIN_NETWORK_SIZE
        )));
    }
    if request.num_networks == 0 {
        return Err(ProvisionError::Validation("number of networks must be at least 1".to_string()));
    }
    // size is a power of two in 4..=2^31, so this fits a u8
    Ok((32 - size.trailing_zeros()) as u8)
}

fn v4_subnet(parent: &Ipv4Net, prefix: u8, size: u32, index: u32) -> Result<Ipv4Net, ProvisionError> {
    let outside = || {
        ProvisionError::Validation(format!(
            "subnet {} of size {} falls outside {}",
            index, size, parent
        ))
    };
    if prefix < parent.prefix_len() {
        return Err(outside());
    }

    let base = u64::from(u32::from(parent.network()));
    let start = base + u64::from(index) * u64::from(size);
    let end = start + u64::from(size) - 1;
    if end > u64::from(u32::from(parent.broadcast())) {
        return Err(outside());
    }

    let start = u32::try_from(start).map_err(|_| outside())?;
    Ipv4Net::new(Ipv4Addr::from(start), prefix).map_err(|_| outside())
}

fn v6_subnet(parent: &Ipv6Net, index: u32) -> Result<Ipv6Net, ProvisionError> {
    let outside = || {
        ProvisionError::Validation(format!("v6 subnet {} falls outside {}", index, parent))
    };
    if parent.prefix_len() > V6_SUBNET_PREFIX {
        return Err(outside());
    }

    let available_bits = u32::from(V6_SUBNET_PREFIX - parent.prefix_len());
    if available_bits < 32 && u64::from(index) >= 1u64 << available_bits {
        return Err(outside());
    }

    let start = u128::from(parent.network()) + (u128::from(index) << 64);
    Ipv6Net::new(Ipv6Addr::from(start), V6_SUBNET_PREFIX).map_err(|_| outside())
}

fn v4_offset(net: &Ipv4Net, offset: u32) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(net.network()).wrapping_add(offset))
}

fn build_network(
    request: &PartitionRequest,
    index: u32,
    cidr: Ipv4Net,
    cidr_v6: Option<Ipv6Net>,
) -> Result<NewNetwork, ProvisionError> {
    let label = if request.num_networks > 1 {
        format!("{}_{}", request.label, index)
    } else {
        request.label.clone()
    };

    let mut net = NewNetwork::from_block(label, cidr);
    net.tenant_id = request.tenant_id.clone();
    net.priority = request.priority;
    net.multi_host = request.multi_host;
    net.bridge = request.bridge.clone();
    net.bridge_interface = request.bridge_interface.clone();
    net.dns1 = request.dns1;
    net.dns2 = request.dns2;

    if let Some(v6) = cidr_v6 {
        net.cidr_v6 = Some(v6);
        net.gateway_v6 = Some(
            request
                .gateway_v6
                .unwrap_or_else(|| Ipv6Addr::from(u128::from(v6.network()) + 1)),
        );
    }

    if let Some(vpn) = request.vpn {
        let offset = u16::try_from(index)
            .map_err(|_| ProvisionError::Validation(format!("too many VPN networks: {}", index)))?;
        let vlan = vpn.vlan_start.checked_add(offset).ok_or_else(|| {
            ProvisionError::Validation(format!("VLAN {} + {} overflows", vpn.vlan_start, offset))
        })?;
        let port = vpn.vpn_start.checked_add(offset).ok_or_else(|| {
            ProvisionError::Validation(format!("VPN port {} + {} overflows", vpn.vpn_start, offset))
        })?;

        net.dns1 = None;
        net.dns2 = None;
        net.vlan = Some(vlan);
        net.bridge = Some(format!("br{}", vlan));
        net.vpn_private_address = Some(v4_offset(&cidr, 2));
        net.dhcp_start = v4_offset(&cidr, 3);
        net.vpn_public_port = Some(port);
    }

    Ok(net)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cidr: &str, num_networks: u32, network_size: u32) -> PartitionRequest {
        PartitionRequest {
            label: "net".to_string(),
            cidr: cidr.parse().unwrap(),
            num_networks,
            network_size,
            cidr_v6: None,
            gateway_v6: None,
            tenant_id: None,
            priority: None,
            multi_host: false,
            bridge: None,
            bridge_interface: None,
            dns1: None,
            dns2: None,
            vpn: None,
        }
    }

    fn cidrs(plans: &[SubnetPlan]) -> Vec<String> {
        plans.iter().map(|p| p.network.cidr.to_string()).collect()
    }

    #[test]
    fn test_consecutive_subnets() {
        let plans = partition(&request("10.1.0.0/20", 3, 256), false).unwrap();
        assert_eq!(cidrs(&plans), vec!["10.1.0.0/24", "10.1.1.0/24", "10.1.2.0/24"]);

        let first = &plans[0].network;
        assert_eq!(first.gateway, Ipv4Addr::new(10, 1, 0, 1));
        assert_eq!(first.broadcast, Ipv4Addr::new(10, 1, 0, 255));
        assert_eq!(first.dhcp_start, Ipv4Addr::new(10, 1, 0, 2));
        assert_eq!(first.netmask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(plans[2].network.gateway, Ipv4Addr::new(10, 1, 2, 1));
    }

    #[test]
    fn test_single_network_keeps_plain_label() {
        let plans = partition(&request("10.1.1.0/24", 1, 64), false).unwrap();
        assert_eq!(cidrs(&plans), vec!["10.1.1.0/26"]);
        assert_eq!(plans[0].network.label, "net");

        let plans = partition(&request("10.1.1.0/24", 2, 64), false).unwrap();
        assert_eq!(plans[0].network.label, "net_0");
        assert_eq!(plans[1].network.label, "net_1");
    }

    #[test]
    fn test_v6_subnets_advance_one_slash_64_per_index() {
        let mut req = request("10.1.0.0/16", 2, 256);
        req.cidr_v6 = Some("fe::/60".parse().unwrap());
        let plans = partition(&req, true).unwrap();

        assert_eq!(plans[0].network.cidr_v6, Some("fe::/64".parse().unwrap()));
        assert_eq!(plans[1].network.cidr_v6, Some("fe:0:0:1::/64".parse().unwrap()));
        assert_eq!(plans[0].network.gateway_v6, Some("fe::1".parse().unwrap()));
        assert_eq!(plans[1].network.gateway_v6, Some("fe:0:0:1::1".parse().unwrap()));
        assert_eq!(plans[0].netmask_v6().as_deref(), Some("64"));
    }

    #[test]
    fn test_supplied_v6_gateway_wins() {
        let mut req = request("10.1.0.0/16", 2, 256);
        req.cidr_v6 = Some("fe::/60".parse().unwrap());
        req.gateway_v6 = Some("fe::ffff".parse().unwrap());
        let plans = partition(&req, true).unwrap();
        assert!(plans.iter().all(|p| p.network.gateway_v6 == Some("fe::ffff".parse().unwrap())));
    }

    #[test]
    fn test_v6_block_ignored_when_ipv6_disabled() {
        let mut req = request("10.1.0.0/16", 1, 256);
        req.cidr_v6 = Some("fe::/60".parse().unwrap());
        let plans = partition(&req, false).unwrap();
        assert_eq!(plans[0].network.cidr_v6, None);
        assert_eq!(plans[0].netmask_v6(), None);
    }

    #[test]
    fn test_vpn_mode() {
        let mut req = request("10.0.0.0/16", 2, 256);
        req.dns1 = Some("8.8.8.8".parse().unwrap());
        req.vpn = Some(VpnSettings {
            vlan_start: 100,
            vpn_start: 1000,
        });
        let plans = partition(&req, false).unwrap();

        let second = &plans[1].network;
        assert_eq!(second.vlan, Some(101));
        assert_eq!(second.bridge.as_deref(), Some("br101"));
        assert_eq!(second.vpn_private_address, Some(Ipv4Addr::new(10, 0, 1, 2)));
        assert_eq!(second.dhcp_start, Ipv4Addr::new(10, 0, 1, 3));
        assert_eq!(second.vpn_public_port, Some(1001));
        assert_eq!(second.dns1, None);
    }

    #[test]
    fn test_rejects_bad_sizes() {
        for size in [0, 3, 100, 2] {
            let result = partition(&request("10.0.0.0/16", 1, size), false);
            assert!(matches!(result, Err(ProvisionError::Validation(_))), "size {}", size);
        }
        let result = partition(&request("10.0.0.0/16", 0, 256), false);
        assert!(matches!(result, Err(ProvisionError::Validation(_))));
    }

    #[test]
    fn test_rejects_subnets_outside_parent() {
        let result = partition(&request("10.1.1.0/24", 5, 64), false);
        assert!(matches!(result, Err(ProvisionError::Validation(_))));

        let result = partition(&request("10.1.1.0/24", 1, 512), false);
        assert!(matches!(result, Err(ProvisionError::Validation(_))));

        let mut req = request("10.0.0.0/16", 17, 256);
        req.cidr_v6 = Some("fe::/60".parse().unwrap());
        let result = partition(&req, true);
        assert!(matches!(result, Err(ProvisionError::Validation(_))));
    }

    #[test]
    fn test_ipv6_enabled_requires_block() {
        let result = partition(&request("10.0.0.0/16", 1, 256), true);
        assert!(matches!(result, Err(ProvisionError::Validation(_))));
    }
}
