//! NetCtlClient trait for mocking
//!
//! This trait abstracts the network-control client so the provisioner can
//! be exercised against an in-memory backend in unit tests.

use crate::error::NetCtlError;

/// Trait for network-control backend operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait NetCtlClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    // Networks
    async fn create_network(&self, tenant_id: &str, name: &str) -> Result<String, NetCtlError>;
    async fn network_exists(&self, tenant_id: &str, network_id: &str) -> Result<bool, NetCtlError>;
    async fn get_network_by_name(&self, tenant_id: &str, name: &str) -> Result<Option<String>, NetCtlError>;

    // Ports and attachments
    async fn create_port(&self, tenant_id: &str, network_id: &str) -> Result<String, NetCtlError>;
    async fn plug_interface(&self, tenant_id: &str, network_id: &str, port_id: &str, attachment_id: &str) -> Result<(), NetCtlError>;
    async fn unplug_interface(&self, tenant_id: &str, network_id: &str, port_id: &str) -> Result<(), NetCtlError>;
    async fn delete_port(&self, tenant_id: &str, network_id: &str, port_id: &str) -> Result<(), NetCtlError>;
    async fn find_port_by_attachment(&self, tenant_id: &str, network_id: &str, attachment_id: &str) -> Result<Option<String>, NetCtlError>;
}
