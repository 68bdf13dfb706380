//! Address-management client errors

use thiserror::Error;

/// Errors that can occur when talking to the address-management backend
#[derive(Debug, Error)]
pub enum IpamError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("IPAM API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network, port or block not found
    #[error("Not found: {0}")]
    NotFound(String),
}
