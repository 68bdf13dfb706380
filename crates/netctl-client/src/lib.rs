//! Network-Control Backend Client
//!
//! A Rust client for the network-control backend: tenant-scoped networks,
//! ports on those networks, and the attachments that bind an instance's
//! virtual interface to a port.
//!
//! # Example
//!
//! ```no_run
//! use netctl_client::{NetCtlClient, NetCtlClientTrait};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NetCtlClient::new("http://127.0.0.1:9696".to_string(), Duration::from_secs(30))?;
//!
//! // Create a port on a network and plug an interface into it
//! let port_id = client.create_port("tenant1", "net-uuid").await?;
//! client.plug_interface("tenant1", "net-uuid", &port_id, "instance-1-7").await?;
//!
//! // Find it again by attachment
//! let found = client.find_port_by_attachment("tenant1", "net-uuid", "instance-1-7").await?;
//! assert_eq!(found.as_deref(), Some(port_id.as_str()));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod netctl_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::NetCtlClient;
pub use common::HttpClient;
pub use error::NetCtlError;
pub use models::*;
pub use netctl_trait::NetCtlClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{MockNetCtlClient, NetCtlCall};
