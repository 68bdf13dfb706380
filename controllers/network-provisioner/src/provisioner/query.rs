//! Descriptor queries

use super::Provisioner;
use crate::assembler::{allocation_from_record, assemble};
use crate::backoff::retry_read;
use crate::error::ProvisionError;
use netmodel::{InstanceFlavor, IpAllocation, NetworkDescriptor};
use tracing::warn;

impl Provisioner {
    /// Recompute the descriptors of an instance from its interfaces and the
    /// address-management backend's current allocations
    ///
    /// Interfaces holding no addresses (a network that failed during
    /// allocation) are skipped.
    pub async fn get_instance_network_info(
        &self,
        instance_id: &str,
        flavor: &InstanceFlavor,
    ) -> Result<Vec<NetworkDescriptor>, ProvisionError> {
        let vifs = self.store.vifs_for_instance(instance_id).await?;
        let mut descriptors = Vec::with_capacity(vifs.len());

        for vif in &vifs {
            let network = self.store.get_network(vif.network_id).await?;
            let ipam = self.ipam.as_ref();
            let (network_id, vif_id) = (network.id, vif.id);
            let scope = Self::ipam_scope(&network);
            let records = retry_read(
                "list allocations",
                self.config.read_retries,
                self.read_backoff(),
                move || ipam.get_allocated_ips(network_id, vif_id, scope),
            )
            .await?;

            if records.is_empty() {
                warn!("Interface {} on network {} holds no addresses; skipping", vif.id, network.id);
                continue;
            }

            let allocations = records
                .iter()
                .map(allocation_from_record)
                .collect::<Result<Vec<IpAllocation>, _>>()?;
            descriptors.push(assemble(&network, vif, flavor, &allocations, self.config.netmask_override)?);
        }

        Ok(descriptors)
    }
}
