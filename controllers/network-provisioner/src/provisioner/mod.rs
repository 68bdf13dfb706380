//! Provisioning orchestration
//!
//! `Provisioner` drives the network-control and address-management
//! backends for one instance at a time:
//! - `allocate`: select networks, create interfaces, ports and leases
//! - `teardown`: the symmetric release of everything `allocate` created
//! - `networks`: partition blocks into network records and register them
//! - `query`: recompute the descriptors of an instance

pub mod allocate;
pub mod networks;
#[cfg(test)]
mod networks_test;
pub mod query;
pub mod teardown;
#[cfg(test)]
mod teardown_test;

use crate::backoff::FibonacciBackoff;
use crate::config::ProvisionerConfig;
use crate::selector::SelectionPolicy;
use crate::store::NetworkStore;
use ipam_client::IpamClientTrait;
use netctl_client::NetCtlClientTrait;
use netmodel::Network;
use std::sync::Arc;

/// Cap for the read retry backoff, as a multiple of its base
const READ_BACKOFF_CAP_FACTOR: u32 = 8;

/// Drives both backends against the network store
pub struct Provisioner {
    pub(crate) store: Arc<dyn NetworkStore>,
    pub(crate) netctl: Box<dyn NetCtlClientTrait + Send + Sync>,
    pub(crate) ipam: Box<dyn IpamClientTrait + Send + Sync>,
    pub(crate) config: ProvisionerConfig,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("netctl", &self.netctl.base_url())
            .field("ipam", &self.ipam.base_url())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    pub fn new(
        store: Arc<dyn NetworkStore>,
        netctl: Box<dyn NetCtlClientTrait + Send + Sync>,
        ipam: Box<dyn IpamClientTrait + Send + Sync>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            store,
            netctl,
            ipam,
            config,
        }
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            filter_unbound_vlans: self.config.filter_unbound_vlans,
            require_private_network: self.config.require_private_network,
        }
    }

    /// Tenant used on the network-control backend for `network`
    pub(crate) fn netctl_tenant<'a>(&'a self, network: &'a Network) -> &'a str {
        network.tenant_id.as_deref().unwrap_or(&self.config.default_tenant)
    }

    /// Address-management scope: the owning tenant, or unscoped when shared
    pub(crate) fn ipam_scope(network: &Network) -> Option<&str> {
        network.tenant_id.as_deref()
    }

    pub(crate) fn read_backoff(&self) -> FibonacciBackoff {
        let base = self.config.read_retry_backoff();
        FibonacciBackoff::new(base, base * READ_BACKOFF_CAP_FACTOR)
    }
}
