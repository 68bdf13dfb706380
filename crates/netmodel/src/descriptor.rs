//! Network descriptors
//!
//! The read-only configuration handed to the instance-launch layer, one
//! per virtual interface. Descriptors are derived on every query and never
//! stored.

use crate::network::{AddressBlockV4, AddressBlockV6};
use serde::{Deserialize, Serialize};

/// Identity half of a descriptor: which network the interface sits on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NetworkIdentity {
    pub id: u64,
    /// Backend handle when the network-control backend manages the network,
    /// otherwise the local bridge name
    #[serde(default)]
    pub bridge: Option<String>,
    #[serde(default)]
    pub bridge_interface: Option<String>,
    pub cidr: AddressBlockV4,
    #[serde(default)]
    pub cidr_v6: Option<AddressBlockV6>,
    pub injected: bool,
    #[serde(default)]
    pub vlan: Option<u16>,
    pub multi_host: bool,
}

/// One address entry of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpEntry {
    pub ip: String,
    pub netmask: String,
    #[serde(with = "enabled_flag")]
    pub enabled: bool,
}

impl IpEntry {
    pub fn enabled(ip: impl Into<String>, netmask: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            netmask: netmask.into(),
            enabled: true,
        }
    }
}

/// Configuration half of a descriptor: what the guest should configure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NetworkConfiguration {
    pub label: String,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub broadcast: Option<String>,
    pub mac: String,
    pub rxtx_cap: u32,
    pub dns: Vec<String>,
    pub ips: Vec<IpEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip6s: Option<Vec<IpEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway6: Option<String>,
}

/// Descriptor for one virtual interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub identity: NetworkIdentity,
    pub configuration: NetworkConfiguration,
}

/// The launch layer expects `"1"`/`"0"` rather than JSON booleans
mod enabled_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "1" } else { "0" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid enabled flag: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_entry_serializes_enabled_as_string() {
        let entry = IpEntry::enabled("10.1.1.2", "255.255.255.0");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ip": "10.1.1.2", "netmask": "255.255.255.0", "enabled": "1"})
        );
        let back: IpEntry = serde_json::from_value(json).unwrap();
        assert!(back.enabled);
    }

    #[test]
    fn test_configuration_omits_v6_fields_when_absent() {
        let config = NetworkConfiguration {
            label: "private".to_string(),
            gateway: Some("10.1.1.1".to_string()),
            broadcast: Some("10.1.1.255".to_string()),
            mac: "02:16:3e:00:00:01".to_string(),
            rxtx_cap: 0,
            dns: vec![],
            ips: vec![IpEntry::enabled("10.1.1.2", "255.255.255.0")],
            ip6s: None,
            gateway6: None,
        };
        let json = serde_json::to_value(&config).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("ip6s"));
        assert!(!object.contains_key("gateway6"));
    }
}
