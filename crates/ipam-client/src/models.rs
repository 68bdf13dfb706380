//! Address-management API models
//!
//! Request and response bodies of the `/v0.1/ipam` API. Addresses are kept
//! as strings at this boundary; callers parse them into typed records.

use serde::{Deserialize, Serialize};

/// Block type registered for every provisioned network
pub const PRIVATE_BLOCK_TYPE: &str = "private";

/// Body of `POST [/tenants/{t}]/ip_blocks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockRequest {
    pub ip_block: IpBlockBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpBlockBody {
    pub cidr: String,
    pub network_id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns2: Option<String>,
}

impl CreateBlockRequest {
    pub fn private(network_id: u64, cidr: &str, dns1: Option<&str>, dns2: Option<&str>) -> Self {
        Self {
            ip_block: IpBlockBody {
                cidr: cidr.to_string(),
                network_id: network_id.to_string(),
                block_type: PRIVATE_BLOCK_TYPE.to_string(),
                dns1: dns1.map(str::to_string),
                dns2: dns2.map(str::to_string),
            },
        }
    }
}

/// Body of `POST .../ip_allocations` when a MAC address is known
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateRequest {
    pub network: AllocateNetwork,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateNetwork {
    pub mac_address: String,
}

impl AllocateRequest {
    pub fn with_mac(mac_address: &str) -> Self {
        Self {
            network: AllocateNetwork {
                mac_address: mac_address.to_string(),
            },
        }
    }
}

/// The block an address was drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpBlockRef {
    pub cidr: String,
    #[serde(default)]
    pub netmask: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub broadcast: Option<String>,
    #[serde(default)]
    pub dns1: Option<String>,
    #[serde(default)]
    pub dns2: Option<String>,
}

/// A leased address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddressRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub address: String,
    pub version: u8,
    pub ip_block: IpBlockRef,
}

impl IpAddressRecord {
    pub fn is_v4(&self) -> bool {
        self.version == 4
    }

    pub fn is_v6(&self) -> bool {
        self.version == 6
    }
}

/// Allocation responses: `{"ip_addresses": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAddressList {
    #[serde(default)]
    pub ip_addresses: Vec<IpAddressRecord>,
}
