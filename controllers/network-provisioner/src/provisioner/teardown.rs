//! Per-instance teardown

use super::Provisioner;
use crate::backoff::retry_read;
use crate::error::ProvisionError;
use netmodel::{Network, VirtualInterface};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// What a teardown removed, and what it could not
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub instance_id: String,
    pub interfaces_removed: usize,
    pub ports_removed: usize,
    pub releases: usize,
    pub failures: Vec<String>,
}

impl Provisioner {
    /// Release everything `allocate_for_instance` created for an instance
    ///
    /// Backend failures are logged and collected in the report; they never
    /// stop the remaining interfaces from being released. Interface records
    /// are always deleted at the end. Calling this again is a no-op.
    pub async fn deallocate_for_instance(&self, instance_id: &str) -> Result<TeardownReport, ProvisionError> {
        let mut report = TeardownReport {
            instance_id: instance_id.to_string(),
            ..Default::default()
        };

        let vifs = self.store.vifs_for_instance(instance_id).await?;
        if vifs.is_empty() {
            debug!("Instance {} has no interfaces; nothing to tear down", instance_id);
            return Ok(report);
        }

        for vif in &vifs {
            let network = match self.store.get_network(vif.network_id).await {
                Ok(network) => network,
                Err(e) => {
                    warn!("Interface {} references missing network {}: {}", vif.id, vif.network_id, e);
                    report.failures.push(format!("interface {}: {}", vif.id, e));
                    continue;
                }
            };

            self.release_port(&network, vif, &mut report).await;

            match self
                .ipam
                .deallocate_ips(network.id, vif.id, Self::ipam_scope(&network))
                .await
            {
                Ok(()) => report.releases += 1,
                Err(e) => {
                    error!(
                        "Failed to release addresses of interface {} on network {}: {}",
                        vif.id, network.id, e
                    );
                    report.failures.push(format!("release interface {}: {}", vif.id, e));
                }
            }
        }

        report.interfaces_removed = self.store.delete_vifs_for_instance(instance_id).await?;
        info!(
            "Tore down instance {}: {} interface(s), {} port(s), {} failure(s)",
            instance_id,
            report.interfaces_removed,
            report.ports_removed,
            report.failures.len()
        );
        Ok(report)
    }

    /// Find the port carrying the interface's attachment, unplug and delete it
    async fn release_port(&self, network: &Network, vif: &VirtualInterface, report: &mut TeardownReport) {
        let Some(handle) = network.backend_handle.as_deref() else {
            debug!("Network {} has no network-control handle; no port to remove", network.id);
            return;
        };
        let tenant = self.netctl_tenant(network);
        let attachment = vif.attachment.to_string();

        let netctl = self.netctl.as_ref();
        let wire = attachment.as_str();
        let found = retry_read(
            "find port by attachment",
            self.config.read_retries,
            self.read_backoff(),
            move || netctl.find_port_by_attachment(tenant, handle, wire),
        )
        .await;

        let port = match found {
            Ok(Some(port)) => port,
            Ok(None) => {
                warn!("No port found for attachment {} on network {}", attachment, network.id);
                return;
            }
            Err(e) => {
                error!("Failed to look up port for attachment {}: {}", attachment, e);
                report.failures.push(format!("find port {}: {}", attachment, e));
                return;
            }
        };

        if let Err(e) = self.netctl.unplug_interface(tenant, handle, &port).await {
            report.failures.push(format!("unplug port {}: {}", port, e));
        }
        match self.netctl.delete_port(tenant, handle, &port).await {
            Ok(()) => report.ports_removed += 1,
            Err(e) => {
                error!("Failed to delete port {} on network {}: {}", port, network.id, e);
                report.failures.push(format!("delete port {}: {}", port, e));
            }
        }
    }
}
