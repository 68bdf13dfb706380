//! Network records
//!
//! A network is created once by the network-creation workflow and is
//! immutable afterwards, except for its backend handle which may be filled
//! in after the initial insert.

use chrono::{DateTime, Utc};
use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IPv4 address block (base address + prefix length)
pub type AddressBlockV4 = Ipv4Net;

/// IPv6 address block (base address + prefix length)
pub type AddressBlockV6 = Ipv6Net;

/// Network record as persisted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Network {
    pub id: u64,
    pub label: String,
    /// Owning tenant; `None` places the network in the shared pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub cidr: AddressBlockV4,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    pub dhcp_start: Ipv4Addr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_v6: Option<AddressBlockV6>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_v6: Option<Ipv6Addr>,
    /// Shared-pool ordering key; 0 or unset means "never selected from the pool"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Network id on the network-control backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_interface: Option<String>,
    /// VLAN id; set means the network is VLAN-isolated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    /// Host the network is bound to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub multi_host: bool,
    #[serde(default)]
    pub injected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns1: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns2: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpn_private_address: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpn_public_port: Option<u16>,
    pub created_at: DateTime<Utc>,
}

impl Network {
    /// Whether the network may be picked from the shared pool
    pub fn is_shared_eligible(&self) -> bool {
        self.priority.is_some_and(|p| p > 0)
    }

    /// Whether the network is isolated on its own VLAN
    pub fn is_vlan_isolated(&self) -> bool {
        self.vlan.is_some()
    }

    /// Whether the network is owned by the given tenant
    pub fn is_owned_by(&self, tenant_id: &str) -> bool {
        self.tenant_id.as_deref() == Some(tenant_id)
    }
}

/// Network record before the store has assigned it an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewNetwork {
    pub label: String,
    pub tenant_id: Option<String>,
    pub cidr: AddressBlockV4,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    pub dhcp_start: Ipv4Addr,
    pub cidr_v6: Option<AddressBlockV6>,
    pub gateway_v6: Option<Ipv6Addr>,
    pub priority: Option<u32>,
    pub backend_handle: Option<String>,
    pub bridge: Option<String>,
    pub bridge_interface: Option<String>,
    pub vlan: Option<u16>,
    pub host: Option<String>,
    pub multi_host: bool,
    pub injected: bool,
    pub dns1: Option<IpAddr>,
    pub dns2: Option<IpAddr>,
    pub vpn_private_address: Option<Ipv4Addr>,
    pub vpn_public_port: Option<u16>,
}

impl NewNetwork {
    /// Minimal record for a v4 block; gateway, broadcast and dhcp start are
    /// derived from the block (offsets 1, last and 2).
    pub fn from_block(label: impl Into<String>, cidr: AddressBlockV4) -> Self {
        let base = u32::from(cidr.network());
        Self {
            label: label.into(),
            tenant_id: None,
            cidr,
            netmask: cidr.netmask(),
            gateway: Ipv4Addr::from(base.wrapping_add(1)),
            broadcast: cidr.broadcast(),
            dhcp_start: Ipv4Addr::from(base.wrapping_add(2)),
            cidr_v6: None,
            gateway_v6: None,
            priority: None,
            backend_handle: None,
            bridge: None,
            bridge_interface: None,
            vlan: None,
            host: None,
            multi_host: false,
            injected: false,
            dns1: None,
            dns2: None,
            vpn_private_address: None,
            vpn_public_port: None,
        }
    }

    /// Materialize the record with the id assigned by the store
    pub fn into_network(self, id: u64, created_at: DateTime<Utc>) -> Network {
        Network {
            id,
            label: self.label,
            tenant_id: self.tenant_id,
            cidr: self.cidr,
            netmask: self.netmask,
            gateway: self.gateway,
            broadcast: self.broadcast,
            dhcp_start: self.dhcp_start,
            cidr_v6: self.cidr_v6,
            gateway_v6: self.gateway_v6,
            priority: self.priority,
            backend_handle: self.backend_handle,
            bridge: self.bridge,
            bridge_interface: self.bridge_interface,
            vlan: self.vlan,
            host: self.host,
            multi_host: self.multi_host,
            injected: self.injected,
            dns1: self.dns1,
            dns2: self.dns2,
            vpn_private_address: self.vpn_private_address,
            vpn_public_port: self.vpn_public_port,
            created_at,
        }
    }
}
