//! Network Provisioner
//!
//! Provisions virtual network attachments for compute instances:
//! - create-networks: partition a block into networks and register them
//! - allocate: attach an instance to its networks and lease addresses
//! - deallocate: release everything an instance holds
//! - show: recompute an instance's network descriptors
//! - select / networks: inspect what an instance would join
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod assembler;
mod backoff;
mod config;
mod error;
mod partition;
mod provisioner;
mod selector;
mod store;
#[cfg(test)]
mod test_utils;

use crate::config::ProvisionerConfig;
use crate::partition::{PartitionRequest, VpnSettings};
use crate::provisioner::allocate::InstanceRequest;
use crate::provisioner::Provisioner;
use crate::store::{MemoryStore, NetworkStore};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ipam_client::IpamClient;
use ipnet::{Ipv4Net, Ipv6Net};
use netctl_client::NetCtlClient;
use netmodel::InstanceFlavor;
use serde::Serialize;
use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;
use tracing::{info, warn};

/// Network provisioner for multi-tenant compute instances
#[derive(Parser, Debug)]
#[command(name = "network-provisioner", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Partition a block into networks and register them with both backends
    CreateNetworks(CreateNetworksArgs),
    /// Attach an instance to its networks and lease its addresses
    Allocate {
        #[arg(long)]
        instance: String,
        #[arg(long)]
        tenant: String,
        #[command(flatten)]
        flavor: FlavorArgs,
    },
    /// Release every attachment and lease of an instance
    Deallocate {
        #[arg(long)]
        instance: String,
    },
    /// Recompute the network descriptors of an instance
    Show {
        #[arg(long)]
        instance: String,
        #[command(flatten)]
        flavor: FlavorArgs,
    },
    /// Networks an instance of this tenant would join, in order
    Select {
        #[arg(long)]
        tenant: String,
    },
    /// Every known network
    Networks,
}

#[derive(Args, Debug)]
struct CreateNetworksArgs {
    #[arg(long)]
    label: String,
    /// Parent IPv4 block
    #[arg(long)]
    cidr: Ipv4Net,
    #[arg(long, default_value = "1")]
    num_networks: u32,
    /// Addresses per network (power of two)
    #[arg(long, default_value = "256")]
    network_size: u32,
    /// Parent IPv6 block (used when IPv6 is enabled)
    #[arg(long)]
    cidr_v6: Option<Ipv6Net>,
    #[arg(long)]
    gateway_v6: Option<Ipv6Addr>,
    /// Owning tenant; omit for a shared network
    #[arg(long)]
    tenant: Option<String>,
    /// Shared-pool priority (required for shared networks)
    #[arg(long)]
    priority: Option<u32>,
    #[arg(long)]
    multi_host: bool,
    #[arg(long)]
    bridge: Option<String>,
    #[arg(long)]
    bridge_interface: Option<String>,
    #[arg(long)]
    dns1: Option<IpAddr>,
    #[arg(long)]
    dns2: Option<IpAddr>,
    /// First VLAN id; enables VPN mode together with --vpn-start
    #[arg(long, requires = "vpn_start")]
    vlan_start: Option<u16>,
    /// First VPN public port
    #[arg(long, requires = "vlan_start")]
    vpn_start: Option<u16>,
}

impl From<CreateNetworksArgs> for PartitionRequest {
    fn from(args: CreateNetworksArgs) -> Self {
        let vpn = match (args.vlan_start, args.vpn_start) {
            (Some(vlan_start), Some(vpn_start)) => Some(VpnSettings { vlan_start, vpn_start }),
            _ => None,
        };
        PartitionRequest {
            label: args.label,
            cidr: args.cidr,
            num_networks: args.num_networks,
            network_size: args.network_size,
            cidr_v6: args.cidr_v6,
            gateway_v6: args.gateway_v6,
            tenant_id: args.tenant,
            priority: args.priority,
            multi_host: args.multi_host,
            bridge: args.bridge,
            bridge_interface: args.bridge_interface,
            dns1: args.dns1,
            dns2: args.dns2,
            vpn,
        }
    }
}

#[derive(Args, Debug)]
struct FlavorArgs {
    #[arg(long, default_value = "0")]
    flavor_id: u64,
    #[arg(long, default_value = "")]
    flavor_name: String,
    /// Rate limit applied to every interface
    #[arg(long, default_value = "0")]
    rxtx_cap: u32,
}

impl From<FlavorArgs> for InstanceFlavor {
    fn from(args: FlavorArgs) -> Self {
        InstanceFlavor {
            id: args.flavor_id,
            name: args.flavor_name,
            rxtx_cap: args.rxtx_cap,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "network_provisioner=info,netctl_client=info,ipam_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ProvisionerConfig::load().context("loading configuration")?;

    info!("Configuration:");
    info!("  Network-control URL: {}", config.netctl_url());
    info!("  Address-management URL: {}", config.ipam_url());
    info!(
        "  State file: {}",
        config
            .state_file
            .as_deref()
            .map_or("none (in-memory)".into(), |p| p.display().to_string())
    );

    let store: Arc<dyn NetworkStore> = match &config.state_file {
        Some(path) => Arc::new(MemoryStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let netctl = NetCtlClient::new(config.netctl_url(), config.request_timeout())?;
    let ipam = IpamClient::new(config.ipam_url(), config.request_timeout())?;
    let provisioner = Provisioner::new(store.clone(), Box::new(netctl), Box::new(ipam), config);

    match cli.command {
        Command::CreateNetworks(args) => {
            let created = provisioner.create_networks(&args.into()).await?;
            print_json(&created)?;
        }
        Command::Allocate { instance, tenant, flavor } => {
            let request = InstanceRequest {
                instance_id: instance,
                tenant_id: tenant,
                flavor: flavor.into(),
            };
            let report = provisioner.allocate_for_instance(&request).await?;
            for failed in report.failures() {
                warn!(
                    "Network {} ({}) failed at {:?}: {}",
                    failed.label,
                    failed.network_id,
                    failed.stage,
                    failed.error.as_deref().unwrap_or_default()
                );
            }
            print_json(&report)?;
        }
        Command::Deallocate { instance } => {
            let report = provisioner.deallocate_for_instance(&instance).await?;
            print_json(&report)?;
        }
        Command::Show { instance, flavor } => {
            let descriptors = provisioner
                .get_instance_network_info(&instance, &flavor.into())
                .await?;
            print_json(&descriptors)?;
        }
        Command::Select { tenant } => {
            let networks =
                selector::networks_for_instance(store.as_ref(), &tenant, provisioner.selection_policy()).await?;
            print_json(&networks)?;
        }
        Command::Networks => {
            print_json(&store.list_networks().await?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
