//! Network-control client errors

use thiserror::Error;

/// Errors that can occur when talking to the network-control backend
#[derive(Debug, Error)]
pub enum NetCtlError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Network-control API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network or port not found
    #[error("Not found: {0}")]
    NotFound(String),
}
