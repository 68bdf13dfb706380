//! Instance flavors

use serde::{Deserialize, Serialize};

/// Resource flavor of an instance; only the network rate limit matters here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct InstanceFlavor {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Transmit/receive cap applied to every interface of the instance
    #[serde(default)]
    pub rxtx_cap: u32,
}
