//! Descriptor assembly
//!
//! Merges a network record, one of its interfaces and the interface's
//! address allocations into the descriptor the launch layer consumes.

use crate::error::ProvisionError;
use ipam_client::IpAddressRecord;
use ipnet::IpNet;
use netmodel::{
    AllocationBlock, InstanceFlavor, IpAllocation, IpEntry, Network, NetworkConfiguration, NetworkDescriptor,
    NetworkIdentity, VirtualInterface,
};
use std::net::{IpAddr, Ipv4Addr};

/// Build the descriptor of one interface
///
/// The first v4 allocation is the primary one and must exist. v6 fields
/// are only present when the interface holds a v6 allocation.
pub fn assemble(
    network: &Network,
    vif: &VirtualInterface,
    flavor: &InstanceFlavor,
    allocations: &[IpAllocation],
    netmask_override: Option<Ipv4Addr>,
) -> Result<NetworkDescriptor, ProvisionError> {
    let v4: Vec<&IpAllocation> = allocations.iter().filter(|a| a.is_v4()).collect();
    let v6: Vec<&IpAllocation> = allocations.iter().filter(|a| a.is_v6()).collect();

    let primary = v4.first().ok_or_else(|| {
        ProvisionError::Validation(format!(
            "interface {} on network {} has no IPv4 allocation",
            vif.id, network.id
        ))
    })?;

    let identity = NetworkIdentity {
        id: network.id,
        bridge: network.backend_handle.clone().or_else(|| network.bridge.clone()),
        bridge_interface: network.bridge_interface.clone(),
        cidr: network.cidr,
        cidr_v6: network.cidr_v6,
        injected: network.injected,
        vlan: network.vlan,
        multi_host: network.multi_host,
    };

    let ips: Vec<IpEntry> = v4
        .iter()
        .map(|a| {
            let netmask = netmask_override.map_or(a.block.netmask, IpAddr::V4);
            IpEntry::enabled(a.address.to_string(), netmask.to_string())
        })
        .collect();

    let (ip6s, gateway6) = if v6.is_empty() {
        (None, None)
    } else {
        let entries: Vec<IpEntry> = v6
            .iter()
            .map(|a| IpEntry::enabled(a.address.to_string(), a.block.cidr.prefix_len().to_string()))
            .collect();
        let gateway6 = v6[0]
            .block
            .gateway
            .or(network.gateway_v6.map(IpAddr::V6))
            .map(|g| g.to_string());
        (Some(entries), gateway6)
    };

    let configuration = NetworkConfiguration {
        label: network.label.clone(),
        gateway: Some(primary.block.gateway.unwrap_or(IpAddr::V4(network.gateway)).to_string()),
        broadcast: Some(primary.block.broadcast.unwrap_or(IpAddr::V4(network.broadcast)).to_string()),
        mac: vif.mac_address.clone(),
        rxtx_cap: flavor.rxtx_cap,
        dns: dns_servers(network, &primary.block),
        ips,
        ip6s,
        gateway6,
    };

    Ok(NetworkDescriptor { identity, configuration })
}

/// Up to two resolvers: the network's own, else the primary block's
fn dns_servers(network: &Network, block: &AllocationBlock) -> Vec<String> {
    let (dns1, dns2) = if network.dns1.is_some() || network.dns2.is_some() {
        (network.dns1, network.dns2)
    } else {
        (block.dns1, block.dns2)
    };
    [dns1, dns2].into_iter().flatten().map(|d| d.to_string()).collect()
}

/// Convert a backend address record into a typed allocation
///
/// A missing netmask, or one given as a prefix length, is derived from the
/// block's cidr.
pub fn allocation_from_record(record: &IpAddressRecord) -> Result<IpAllocation, ProvisionError> {
    let address: IpAddr = parse_addr("address", &record.address)?;
    let cidr: IpNet = record
        .ip_block
        .cidr
        .parse()
        .map_err(|_| invalid("cidr", &record.ip_block.cidr))?;

    let mut block = AllocationBlock::from_cidr(cidr);
    if let Some(netmask) = record
        .ip_block
        .netmask
        .as_deref()
        .and_then(|m| m.parse::<IpAddr>().ok())
    {
        block.netmask = netmask;
    }
    block.gateway = parse_optional("gateway", record.ip_block.gateway.as_deref())?;
    if let Some(broadcast) = parse_optional("broadcast", record.ip_block.broadcast.as_deref())? {
        block.broadcast = Some(broadcast);
    }
    block.dns1 = parse_optional("dns1", record.ip_block.dns1.as_deref())?;
    block.dns2 = parse_optional("dns2", record.ip_block.dns2.as_deref())?;

    Ok(IpAllocation { address, block })
}

fn parse_addr(field: &str, value: &str) -> Result<IpAddr, ProvisionError> {
    value.parse().map_err(|_| invalid(field, value))
}

fn parse_optional(field: &str, value: Option<&str>) -> Result<Option<IpAddr>, ProvisionError> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| parse_addr(field, v))
        .transpose()
}

fn invalid(field: &str, value: &str) -> ProvisionError {
    ProvisionError::Validation(format!("invalid {} in address record: {}", field, value))
}
