//! Network-control API models
//!
//! Request and response bodies of the tenant-scoped network-control API.
//! Field names follow the backend's dashed JSON keys.

use serde::{Deserialize, Serialize};

/// Body of `POST /networks.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNetworkRequest {
    pub network: NetworkName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkName {
    #[serde(rename = "net-name")]
    pub net_name: String,
}

impl CreateNetworkRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            network: NetworkName {
                net_name: name.into(),
            },
        }
    }
}

/// Single-network response: `{"networks": {"network": {...}}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEnvelope {
    pub networks: NetworkWrapper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkWrapper {
    pub network: NetworkDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Network listing: `{"networks": [{"id": ...}, ...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkList {
    pub networks: Vec<NetworkSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub id: String,
}

/// Body of `POST /networks/{id}/ports.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePortRequest {
    pub port: PortState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortState {
    #[serde(rename = "port-state")]
    pub port_state: String,
}

impl CreatePortRequest {
    pub fn active() -> Self {
        Self {
            port: PortState {
                port_state: "ACTIVE".to_string(),
            },
        }
    }
}

/// Single-port response: `{"ports": {"port": {...}}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortEnvelope {
    pub ports: PortWrapper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortWrapper {
    pub port: PortSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSummary {
    pub id: String,
}

/// Port listing: `{"ports": [{"id": ...}, ...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortList {
    pub ports: Vec<PortSummary>,
}

/// Body of `PUT /networks/{id}/ports/{port}/attachment.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlugRequest {
    pub port: AttachmentBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentBody {
    #[serde(rename = "attachment-id")]
    pub attachment_id: String,
}

impl PlugRequest {
    pub fn new(attachment_id: impl Into<String>) -> Self {
        Self {
            port: AttachmentBody {
                attachment_id: attachment_id.into(),
            },
        }
    }
}

/// Attachment response: `{"attachment": "<id>"}`, null when unplugged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentResponse {
    #[serde(default)]
    pub attachment: Option<String>,
}
