//! Address-Management Backend Client
//!
//! A Rust client for the address-management (IPAM) backend: IP blocks
//! registered per network, and IP allocations leased to a network port
//! (a virtual interface). Every call can optionally be scoped to a tenant.
//!
//! # Example
//!
//! ```no_run
//! use ipam_client::{IpamClient, IpamClientTrait};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IpamClient::new("http://127.0.0.1:9898".to_string(), Duration::from_secs(30))?;
//!
//! // Register a block for network 7 owned by project1
//! client.create_block(7, "10.1.1.0/24", Some("project1"), None, None).await?;
//!
//! // Lease addresses to interface 12 on that network
//! let ips = client.allocate_ips(7, 12, Some("project1"), Some("02:16:3e:00:00:01")).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod ipam_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::IpamClient;
pub use common::HttpClient;
pub use error::IpamError;
pub use ipam_trait::IpamClientTrait;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::{IpamCall, MockIpamClient};
