//! Network selection
//!
//! Decides which networks an instance joins and in which order: the
//! tenant's private network first, then shared networks by priority.

use crate::error::ProvisionError;
use crate::store::NetworkStore;
use netmodel::Network;
use tracing::debug;

/// Selection toggles taken from the provisioner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Drop VLAN-isolated networks that have no host binding
    pub filter_unbound_vlans: bool,
    /// Fail when the tenant owns no network
    pub require_private_network: bool,
}

/// Load the networks visible to `tenant_id` and order them for provisioning
pub async fn networks_for_instance(
    store: &dyn NetworkStore,
    tenant_id: &str,
    policy: SelectionPolicy,
) -> Result<Vec<Network>, ProvisionError> {
    let candidates = store.networks_visible_to(tenant_id).await?;
    select_networks(candidates, tenant_id, policy)
}

/// Order candidate networks for provisioning
///
/// The private network is the tenant's lowest-id network and is always
/// first, whatever its priority. Shared networks with a priority above 0
/// follow in ascending priority, ties broken by network id. Networks owned
/// by other tenants are never selected.
pub fn select_networks(
    candidates: Vec<Network>,
    tenant_id: &str,
    policy: SelectionPolicy,
) -> Result<Vec<Network>, ProvisionError> {
    let usable: Vec<Network> = candidates
        .into_iter()
        .filter(|n| !(policy.filter_unbound_vlans && n.is_vlan_isolated() && n.host.is_none()))
        .collect();

    let private = usable
        .iter()
        .filter(|n| n.is_owned_by(tenant_id))
        .min_by_key(|n| n.id)
        .cloned();

    let mut shared: Vec<Network> = usable
        .into_iter()
        .filter(|n| n.tenant_id.is_none() && n.is_shared_eligible())
        .collect();
    shared.sort_by_key(|n| (n.priority, n.id));

    let mut selected = Vec::with_capacity(shared.len() + 1);
    match private {
        Some(private) => {
            debug!("Found private network {} ({}) for tenant {}", private.label, private.id, tenant_id);
            selected.push(private);
        }
        None if policy.require_private_network => {
            return Err(ProvisionError::NotFound(format!(
                "private network for tenant {}",
                tenant_id
            )));
        }
        None => debug!("Tenant {} has no private network", tenant_id),
    }

    for network in shared {
        debug!("Found network with priority {:?}: {}", network.priority, network.label);
        selected.push(network);
    }
    Ok(selected)
}
