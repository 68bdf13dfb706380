//! Provisioner error types.
//!
//! Every failure is classified into an `ErrorKind` so callers can tell a
//! bad request from a backend outage without matching on messages.

use ipam_client::IpamError;
use netctl_client::NetCtlError;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while provisioning networks.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Malformed request (bad block size, missing v4 allocation, ...)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A network with the same address block already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing private network, network record or backend network
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network-control backend error
    #[error("Network-control error: {0}")]
    NetworkControl(#[from] NetCtlError),

    /// Address-management backend error
    #[error("Address-management error: {0}")]
    AddressManagement(#[from] IpamError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Store read/write failure
    #[error("Store error: {0}")]
    Store(String),
}

/// Classification of a `ProvisionError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Backend,
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::Validation(_) | ProvisionError::InvalidConfig(_) => ErrorKind::Validation,
            ProvisionError::Conflict(_) => ErrorKind::Conflict,
            ProvisionError::NotFound(_) => ErrorKind::NotFound,
            ProvisionError::NetworkControl(_)
            | ProvisionError::AddressManagement(_)
            | ProvisionError::Store(_) => ErrorKind::Backend,
        }
    }
}
