//! Per-instance allocation

use super::Provisioner;
use crate::assembler::{allocation_from_record, assemble};
use crate::error::{ErrorKind, ProvisionError};
use crate::selector;
use netmodel::{generate_mac_address, InstanceFlavor, IpAllocation, Network, NetworkDescriptor};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// An instance asking for network attachments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRequest {
    pub instance_id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub flavor: InstanceFlavor,
}

/// Lifecycle of an instance's networking, as reached by every selected network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePhase {
    Requested,
    NetworksSelected,
    AttachmentsCreated,
    AddressesAllocated,
    Ready,
}

/// How far provisioning got on one network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStage {
    Selected,
    InterfaceRecorded,
    PortAttached,
    AddressesAllocated,
    Described,
}

impl NetworkStage {
    fn phase(self) -> InstancePhase {
        match self {
            NetworkStage::Selected | NetworkStage::InterfaceRecorded => InstancePhase::NetworksSelected,
            NetworkStage::PortAttached => InstancePhase::AttachmentsCreated,
            NetworkStage::AddressesAllocated => InstancePhase::AddressesAllocated,
            NetworkStage::Described => InstancePhase::Ready,
        }
    }
}

/// Result of provisioning one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkOutcome {
    pub network_id: u64,
    pub label: String,
    pub stage: NetworkStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NetworkOutcome {
    fn success(network: &Network) -> Self {
        Self {
            network_id: network.id,
            label: network.label.clone(),
            stage: NetworkStage::Described,
            error_kind: None,
            error: None,
        }
    }

    fn failure(network: &Network, stage: NetworkStage, err: &ProvisionError) -> Self {
        Self {
            network_id: network.id,
            label: network.label.clone(),
            stage,
            error_kind: Some(err.kind()),
            error: Some(err.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Descriptors of the networks that succeeded, plus every network's outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub instance_id: String,
    pub phase: InstancePhase,
    pub descriptors: Vec<NetworkDescriptor>,
    pub outcomes: Vec<NetworkOutcome>,
}

impl ProvisionReport {
    pub fn failures(&self) -> impl Iterator<Item = &NetworkOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

impl Provisioner {
    /// Attach an instance to its selected networks and lease its addresses
    ///
    /// Networks are processed in selection order. A failure on one network
    /// is recorded in its outcome and the next network is attempted, unless
    /// strict mode is on: then the instance is torn down and the first
    /// error is returned.
    pub async fn allocate_for_instance(&self, request: &InstanceRequest) -> Result<ProvisionReport, ProvisionError> {
        let mut phase = InstancePhase::Requested;
        info!(
            "Allocating networks for instance {} (tenant: {}, phase: {:?})",
            request.instance_id, request.tenant_id, phase
        );

        let networks =
            selector::networks_for_instance(self.store.as_ref(), &request.tenant_id, self.selection_policy()).await?;
        phase = InstancePhase::NetworksSelected;
        debug!(
            "Selected {} network(s) for instance {}: {:?}",
            networks.len(),
            request.instance_id,
            networks.iter().map(|n| n.id).collect::<Vec<_>>()
        );

        let mut outcomes = Vec::with_capacity(networks.len());
        let mut descriptors = Vec::with_capacity(networks.len());

        for network in &networks {
            let mut stage = NetworkStage::Selected;
            match self.provision_network(request, network, &mut stage).await {
                Ok(descriptor) => {
                    descriptors.push(descriptor);
                    outcomes.push(NetworkOutcome::success(network));
                }
                Err(e) => {
                    error!(
                        "Failed to provision network {} ({}) for instance {} after stage {:?}: {}",
                        network.label, network.id, request.instance_id, stage, e
                    );
                    if self.config.strict {
                        warn!("Strict mode: tearing down instance {}", request.instance_id);
                        if let Err(te) = self.deallocate_for_instance(&request.instance_id).await {
                            error!("Teardown of instance {} failed: {}", request.instance_id, te);
                        }
                        return Err(e);
                    }
                    outcomes.push(NetworkOutcome::failure(network, stage, &e));
                }
            }
        }

        // Nothing selected means nothing left to do
        phase = outcomes
            .iter()
            .map(|o| o.stage.phase())
            .min()
            .unwrap_or(InstancePhase::Ready)
            .max(phase);
        info!(
            "Instance {} reached phase {:?} ({} of {} network(s) ready)",
            request.instance_id,
            phase,
            descriptors.len(),
            networks.len()
        );

        Ok(ProvisionReport {
            instance_id: request.instance_id.clone(),
            phase,
            descriptors,
            outcomes,
        })
    }

    /// Interface record, then port + attachment, then address lease
    async fn provision_network(
        &self,
        request: &InstanceRequest,
        network: &Network,
        stage: &mut NetworkStage,
    ) -> Result<NetworkDescriptor, ProvisionError> {
        let vif = self
            .store
            .create_vif(&request.instance_id, network.id, &generate_mac_address())
            .await?;
        *stage = NetworkStage::InterfaceRecorded;
        debug!("Created interface {} ({}) on network {}", vif.id, vif.mac_address, network.id);

        let handle = network.backend_handle.as_deref().ok_or_else(|| {
            ProvisionError::NotFound(format!("network-control network for {} ({})", network.label, network.id))
        })?;
        let tenant = self.netctl_tenant(network);
        let port = self.netctl.create_port(tenant, handle).await?;
        if let Err(e) = self
            .netctl
            .plug_interface(tenant, handle, &port, &vif.attachment.to_string())
            .await
        {
            if let Err(cleanup) = self.netctl.delete_port(tenant, handle, &port).await {
                warn!("Failed to remove unplugged port {}: {}", port, cleanup);
            }
            return Err(e.into());
        }
        *stage = NetworkStage::PortAttached;

        let records = self
            .ipam
            .allocate_ips(network.id, vif.id, Self::ipam_scope(network), Some(vif.mac_address.as_str()))
            .await?;
        *stage = NetworkStage::AddressesAllocated;

        let allocations = records
            .iter()
            .map(allocation_from_record)
            .collect::<Result<Vec<IpAllocation>, _>>()?;
        let descriptor = assemble(network, &vif, &request.flavor, &allocations, self.config.netmask_override)?;
        *stage = NetworkStage::Described;
        Ok(descriptor)
    }
}
