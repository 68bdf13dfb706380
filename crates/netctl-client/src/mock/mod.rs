//! Mock NetCtlClient for unit testing
//!
//! This module provides an in-memory implementation of `NetCtlClientTrait`
//! that can be used in unit tests without a running network-control
//! backend. Every call is recorded so tests can assert on exactly which
//! backend side effects happened, and failures can be injected per network.

use crate::error::NetCtlError;
use crate::netctl_trait::NetCtlClientTrait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// A call made against the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetCtlCall {
    CreateNetwork { tenant_id: String, name: String },
    NetworkExists { tenant_id: String, network_id: String },
    GetNetworkByName { tenant_id: String, name: String },
    CreatePort { tenant_id: String, network_id: String },
    PlugInterface { tenant_id: String, network_id: String, port_id: String, attachment_id: String },
    UnplugInterface { tenant_id: String, network_id: String, port_id: String },
    DeletePort { tenant_id: String, network_id: String, port_id: String },
    FindPortByAttachment { tenant_id: String, network_id: String, attachment_id: String },
}

#[derive(Debug, Clone)]
struct MockNetwork {
    tenant_id: String,
    name: String,
}

#[derive(Debug, Clone)]
struct MockPort {
    network_id: String,
    attachment: Option<String>,
}

/// Mock NetCtlClient for testing
#[derive(Debug, Clone)]
pub struct MockNetCtlClient {
    base_url: String,
    networks: Arc<Mutex<BTreeMap<String, MockNetwork>>>,
    ports: Arc<Mutex<BTreeMap<String, MockPort>>>,
    calls: Arc<Mutex<Vec<NetCtlCall>>>,
    failing_networks: Arc<Mutex<HashSet<String>>>,
    failing_plugs: Arc<Mutex<HashSet<String>>>,
    failing_reads: Arc<Mutex<u32>>,
}

impl MockNetCtlClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            networks: Arc::new(Mutex::new(BTreeMap::new())),
            ports: Arc::new(Mutex::new(BTreeMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing_networks: Arc::new(Mutex::new(HashSet::new())),
            failing_plugs: Arc::new(Mutex::new(HashSet::new())),
            failing_reads: Arc::new(Mutex::new(0)),
        }
    }

    /// Add a network to the mock backend (for test setup)
    pub fn add_network(&self, tenant_id: &str, network_id: &str, name: &str) {
        self.networks.lock().unwrap().insert(
            network_id.to_string(),
            MockNetwork {
                tenant_id: tenant_id.to_string(),
                name: name.to_string(),
            },
        );
    }

    /// Make every port operation on `network_id` fail with an API error
    pub fn fail_network(&self, network_id: &str) {
        self.failing_networks.lock().unwrap().insert(network_id.to_string());
    }

    /// Make only `plug_interface` fail on `network_id`; ports can still be created
    pub fn fail_plug(&self, network_id: &str) {
        self.failing_plugs.lock().unwrap().insert(network_id.to_string());
    }

    /// Make the next `count` read calls fail with an API error
    pub fn fail_next_reads(&self, count: u32) {
        *self.failing_reads.lock().unwrap() = count;
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<NetCtlCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Forget recorded calls (state is kept)
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Ids of ports that currently exist
    pub fn port_ids(&self) -> Vec<String> {
        self.ports.lock().unwrap().keys().cloned().collect()
    }

    /// Attachment currently plugged into a port
    pub fn attachment_of(&self, port_id: &str) -> Option<String> {
        self.ports
            .lock()
            .unwrap()
            .get(port_id)
            .and_then(|p| p.attachment.clone())
    }

    fn record(&self, call: NetCtlCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_network(&self, network_id: &str) -> Result<(), NetCtlError> {
        if self.failing_networks.lock().unwrap().contains(network_id) {
            return Err(NetCtlError::Api(format!("injected failure on network {}", network_id)));
        }
        if !self.networks.lock().unwrap().contains_key(network_id) {
            return Err(NetCtlError::NotFound(format!("Network {} not found", network_id)));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), NetCtlError> {
        let mut remaining = self.failing_reads.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(NetCtlError::Api("injected transient read failure".to_string()));
        }
        Ok(())
    }

    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[async_trait::async_trait]
impl NetCtlClientTrait for MockNetCtlClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_network(&self, tenant_id: &str, name: &str) -> Result<String, NetCtlError> {
        self.record(NetCtlCall::CreateNetwork {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
        });
        let id = self.next_id();
        self.add_network(tenant_id, &id, name);
        Ok(id)
    }

    async fn network_exists(&self, tenant_id: &str, network_id: &str) -> Result<bool, NetCtlError> {
        self.record(NetCtlCall::NetworkExists {
            tenant_id: tenant_id.to_string(),
            network_id: network_id.to_string(),
        });
        self.check_read()?;
        Ok(self.networks.lock().unwrap().contains_key(network_id))
    }

    async fn get_network_by_name(&self, tenant_id: &str, name: &str) -> Result<Option<String>, NetCtlError> {
        self.record(NetCtlCall::GetNetworkByName {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
        });
        self.check_read()?;
        Ok(self
            .networks
            .lock()
            .unwrap()
            .iter()
            .find(|(_, n)| n.tenant_id == tenant_id && n.name == name)
            .map(|(id, _)| id.clone()))
    }

    async fn create_port(&self, tenant_id: &str, network_id: &str) -> Result<String, NetCtlError> {
        self.record(NetCtlCall::CreatePort {
            tenant_id: tenant_id.to_string(),
            network_id: network_id.to_string(),
        });
        self.check_network(network_id)?;
        let id = self.next_id();
        self.ports.lock().unwrap().insert(
            id.clone(),
            MockPort {
                network_id: network_id.to_string(),
                attachment: None,
            },
        );
        Ok(id)
    }

    async fn plug_interface(&self, tenant_id: &str, network_id: &str, port_id: &str, attachment_id: &str) -> Result<(), NetCtlError> {
        self.record(NetCtlCall::PlugInterface {
            tenant_id: tenant_id.to_string(),
            network_id: network_id.to_string(),
            port_id: port_id.to_string(),
            attachment_id: attachment_id.to_string(),
        });
        self.check_network(network_id)?;
        if self.failing_plugs.lock().unwrap().contains(network_id) {
            return Err(NetCtlError::Api(format!("injected plug failure on network {}", network_id)));
        }
        let mut ports = self.ports.lock().unwrap();
        let port = ports
            .get_mut(port_id)
            .filter(|p| p.network_id == network_id)
            .ok_or_else(|| NetCtlError::NotFound(format!("Port {} not found", port_id)))?;
        port.attachment = Some(attachment_id.to_string());
        Ok(())
    }

    async fn unplug_interface(&self, tenant_id: &str, network_id: &str, port_id: &str) -> Result<(), NetCtlError> {
        self.record(NetCtlCall::UnplugInterface {
            tenant_id: tenant_id.to_string(),
            network_id: network_id.to_string(),
            port_id: port_id.to_string(),
        });
        let mut ports = self.ports.lock().unwrap();
        let port = ports
            .get_mut(port_id)
            .ok_or_else(|| NetCtlError::NotFound(format!("Port {} not found", port_id)))?;
        port.attachment = None;
        Ok(())
    }

    async fn delete_port(&self, tenant_id: &str, network_id: &str, port_id: &str) -> Result<(), NetCtlError> {
        self.record(NetCtlCall::DeletePort {
            tenant_id: tenant_id.to_string(),
            network_id: network_id.to_string(),
            port_id: port_id.to_string(),
        });
        self.ports
            .lock()
            .unwrap()
            .remove(port_id)
            .map(|_| ())
            .ok_or_else(|| NetCtlError::NotFound(format!("Port {} not found", port_id)))
    }

    async fn find_port_by_attachment(&self, tenant_id: &str, network_id: &str, attachment_id: &str) -> Result<Option<String>, NetCtlError> {
        self.record(NetCtlCall::FindPortByAttachment {
            tenant_id: tenant_id.to_string(),
            network_id: network_id.to_string(),
            attachment_id: attachment_id.to_string(),
        });
        self.check_read()?;
        Ok(self
            .ports
            .lock()
            .unwrap()
            .iter()
            .find(|(_, p)| p.network_id == network_id && p.attachment.as_deref() == Some(attachment_id))
            .map(|(id, _)| id.clone()))
    }
}
