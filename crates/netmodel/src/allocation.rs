//! Address allocations
//!
//! Allocations are owned by the address-management backend. They are
//! referenced while composing descriptors but never persisted locally.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// The block an allocation was drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AllocationBlock {
    pub cidr: IpNet,
    pub netmask: IpAddr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns1: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns2: Option<IpAddr>,
}

impl AllocationBlock {
    /// Block with netmask and broadcast derived from the cidr
    pub fn from_cidr(cidr: IpNet) -> Self {
        Self {
            cidr,
            netmask: cidr.netmask(),
            gateway: None,
            broadcast: match cidr {
                IpNet::V4(net) => Some(IpAddr::V4(net.broadcast())),
                IpNet::V6(_) => None,
            },
            dns1: None,
            dns2: None,
        }
    }
}

/// One address leased to a virtual interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IpAllocation {
    pub address: IpAddr,
    pub block: AllocationBlock,
}

impl IpAllocation {
    pub fn is_v4(&self) -> bool {
        self.address.is_ipv4()
    }

    pub fn is_v6(&self) -> bool {
        self.address.is_ipv6()
    }
}
