//! Virtual interfaces
//!
//! A VIF joins one instance to one network. Its attachment identity is the
//! key the network-control backend uses to correlate a port with the VIF.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Composite attachment key: one per (instance, network) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentId {
    pub instance_id: String,
    pub network_id: u64,
}

impl AttachmentId {
    pub fn new(instance_id: impl Into<String>, network_id: u64) -> Self {
        Self {
            instance_id: instance_id.into(),
            network_id,
        }
    }
}

/// Wire form is `<instance_id>-<network_id>`; network ids are numeric so the
/// last dash always separates the two parts.
impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.instance_id, self.network_id)
    }
}

/// Error parsing an attachment id from its wire form
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid attachment id: {0}")]
pub struct AttachmentIdParseError(pub String);

impl FromStr for AttachmentId {
    type Err = AttachmentIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (instance_id, network_id) = s
            .rsplit_once('-')
            .ok_or_else(|| AttachmentIdParseError(s.to_string()))?;
        if instance_id.is_empty() {
            return Err(AttachmentIdParseError(s.to_string()));
        }
        let network_id = network_id
            .parse::<u64>()
            .map_err(|_| AttachmentIdParseError(s.to_string()))?;
        Ok(Self::new(instance_id, network_id))
    }
}

/// Virtual interface record as persisted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VirtualInterface {
    pub id: u64,
    pub instance_id: String,
    pub network_id: u64,
    pub mac_address: String,
    pub attachment: AttachmentId,
    pub created_at: DateTime<Utc>,
}

/// Generate a MAC address with the locally administered bit set and the
/// multicast bit cleared.
pub fn generate_mac_address() -> String {
    let uuid = Uuid::new_v4();
    let bytes = uuid.as_bytes();
    let b0 = (bytes[0] & 0xfe) | 0x02;
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        b0, bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
    )
}
