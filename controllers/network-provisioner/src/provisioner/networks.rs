//! Network creation workflow

use super::Provisioner;
use crate::backoff::retry_read;
use crate::error::ProvisionError;
use crate::partition::{partition, PartitionRequest};
use netmodel::{Network, NewNetwork};
use tracing::{debug, info};

impl Provisioner {
    /// Partition a block into networks, insert them and register their blocks
    ///
    /// Subnets are created in order. A block conflict aborts the rest of the
    /// batch; networks created before it are kept.
    pub async fn create_networks(&self, request: &PartitionRequest) -> Result<Vec<Network>, ProvisionError> {
        let mut request = request.clone();
        // "" and "0" both mean no tenant
        request.tenant_id = request.tenant_id.take().filter(|t| !matches!(t.as_str(), "" | "0"));
        if request.tenant_id.is_none() && request.priority.is_none() {
            return Err(ProvisionError::Validation(
                "shared networks require an explicit priority".to_string(),
            ));
        }

        let plans = partition(&request, self.config.use_ipv6)?;
        info!(
            "Creating {} network(s) of size {} from {}",
            plans.len(),
            request.network_size,
            request.cidr
        );

        let mut created = Vec::with_capacity(plans.len());
        for plan in plans {
            debug!(
                "Subnet {}: {} (v6: {:?}, v6 netmask: {:?})",
                plan.index,
                plan.network.cidr,
                plan.network.cidr_v6,
                plan.netmask_v6()
            );
            let mut new = plan.network;
            new.backend_handle = Some(self.resolve_backend_handle(&new).await?);

            let cidr = new.cidr;
            let network = self
                .store
                .create_network_safe(new)
                .await?
                .ok_or_else(|| ProvisionError::Conflict(format!("Network with cidr {} already exists", cidr)))?;
            info!("Created network {} ({}) with cidr {}", network.label, network.id, network.cidr);

            self.register_blocks(&network).await?;
            created.push(network);
        }

        Ok(created)
    }

    /// Network-control network the new record attaches to
    ///
    /// A configured existing network wins. Otherwise a tenant network maps
    /// to `{tenant}_private` and a shared network to its label on the
    /// default tenant, created when absent.
    async fn resolve_backend_handle(&self, network: &NewNetwork) -> Result<String, ProvisionError> {
        let netctl = self.netctl.as_ref();
        let default_tenant = self.config.default_tenant.as_str();

        if let Some(existing) = self.config.existing_network_id.as_deref() {
            let exists = retry_read(
                "get network",
                self.config.read_retries,
                self.read_backoff(),
                move || netctl.network_exists(default_tenant, existing),
            )
            .await?;
            if !exists {
                return Err(ProvisionError::NotFound(format!(
                    "Unable to find network-control network with id: {}",
                    existing
                )));
            }
            return Ok(existing.to_string());
        }

        let (tenant, name) = match network.tenant_id.as_deref() {
            Some(tenant) => (tenant, format!("{}_private", tenant)),
            None => (default_tenant, network.label.clone()),
        };
        let lookup = name.as_str();
        let found = retry_read(
            "get network by name",
            self.config.read_retries,
            self.read_backoff(),
            move || netctl.get_network_by_name(tenant, lookup),
        )
        .await?;

        let handle = match found {
            Some(id) => id,
            None => {
                debug!("No network-control network named {} on tenant {}; creating", name, tenant);
                self.netctl.create_network(tenant, &name).await?
            }
        };
        info!("Network-control network for \"{}\": {}", name, handle);
        Ok(handle)
    }

    async fn register_blocks(&self, network: &Network) -> Result<(), ProvisionError> {
        let scope = Self::ipam_scope(network);
        let dns1 = network.dns1.map(|d| d.to_string());
        let dns2 = network.dns2.map(|d| d.to_string());

        self.ipam
            .create_block(network.id, &network.cidr.to_string(), scope, dns1.as_deref(), dns2.as_deref())
            .await?;
        if let Some(cidr_v6) = network.cidr_v6 {
            self.ipam
                .create_block(network.id, &cidr_v6.to_string(), scope, dns1.as_deref(), dns2.as_deref())
                .await?;
        }
        Ok(())
    }
}
