//! Network Provisioner Model
//!
//! Typed records shared by the provisioner and its backend clients:
//! networks and their address blocks, per-instance virtual interfaces,
//! address allocations handed out by the address-management backend,
//! and the network descriptors returned to the instance-launch layer.

pub mod allocation;
pub mod descriptor;
pub mod flavor;
pub mod interface;
pub mod network;

pub use allocation::*;
pub use descriptor::*;
pub use flavor::*;
pub use interface::*;
pub use network::*;
