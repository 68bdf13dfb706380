//! Provisioner configuration
//!
//! Built from defaults, optionally overlaid by a YAML file named in
//! `NETPROV_CONFIG`, then overridden by individual environment variables.

use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration passed explicitly into the provisioner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    pub netctl_host: String,
    pub netctl_port: u16,
    pub ipam_host: String,
    pub ipam_port: u16,
    /// Network-control tenant used for shared networks
    pub default_tenant: String,
    pub request_timeout_secs: u64,
    /// Attempts for idempotent backend reads (1 = no retry)
    pub read_retries: u32,
    pub read_retry_backoff_ms: u64,
    pub use_ipv6: bool,
    /// Backend network every created network attaches to
    pub existing_network_id: Option<String>,
    /// Skip VLAN networks that are not bound to a host
    pub filter_unbound_vlans: bool,
    pub require_private_network: bool,
    /// Tear the instance down on the first per-network failure
    pub strict: bool,
    pub netmask_override: Option<Ipv4Addr>,
    pub state_file: Option<PathBuf>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            netctl_host: "127.0.0.1".to_string(),
            netctl_port: 9696,
            ipam_host: "127.0.0.1".to_string(),
            ipam_port: 9898,
            default_tenant: "default".to_string(),
            request_timeout_secs: 30,
            read_retries: 3,
            read_retry_backoff_ms: 100,
            use_ipv6: false,
            existing_network_id: None,
            filter_unbound_vlans: true,
            require_private_network: true,
            strict: false,
            netmask_override: None,
            state_file: None,
        }
    }
}

impl ProvisionerConfig {
    /// Load configuration from `NETPROV_CONFIG` (if set) and the environment
    pub fn load() -> Result<Self, ProvisionError> {
        let base = match env::var("NETPROV_CONFIG") {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    /// Parse a YAML configuration file; missing keys keep their defaults
    pub fn from_yaml_file(path: &str) -> Result<Self, ProvisionError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ProvisionError::InvalidConfig(format!("cannot read {}: {}", path, e)))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ProvisionError> {
        serde_yaml::from_str(raw).map_err(|e| ProvisionError::InvalidConfig(e.to_string()))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ProvisionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NETCTL_HOST") {
            self.netctl_host = v;
        }
        if let Some(v) = lookup("NETCTL_PORT") {
            self.netctl_port = parse("NETCTL_PORT", &v)?;
        }
        if let Some(v) = lookup("IPAM_HOST") {
            self.ipam_host = v;
        }
        if let Some(v) = lookup("IPAM_PORT") {
            self.ipam_port = parse("IPAM_PORT", &v)?;
        }
        if let Some(v) = lookup("NETPROV_DEFAULT_TENANT") {
            self.default_tenant = v;
        }
        if let Some(v) = lookup("NETPROV_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse("NETPROV_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("NETPROV_READ_RETRIES") {
            self.read_retries = parse("NETPROV_READ_RETRIES", &v)?;
        }
        if let Some(v) = lookup("NETPROV_READ_RETRY_BACKOFF_MS") {
            self.read_retry_backoff_ms = parse("NETPROV_READ_RETRY_BACKOFF_MS", &v)?;
        }
        if let Some(v) = lookup("NETPROV_USE_IPV6") {
            self.use_ipv6 = parse_flag("NETPROV_USE_IPV6", &v)?;
        }
        if let Some(v) = lookup("NETPROV_EXISTING_NETWORK_ID") {
            self.existing_network_id = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = lookup("NETPROV_FILTER_UNBOUND_VLANS") {
            self.filter_unbound_vlans = parse_flag("NETPROV_FILTER_UNBOUND_VLANS", &v)?;
        }
        if let Some(v) = lookup("NETPROV_REQUIRE_PRIVATE_NETWORK") {
            self.require_private_network = parse_flag("NETPROV_REQUIRE_PRIVATE_NETWORK", &v)?;
        }
        if let Some(v) = lookup("NETPROV_STRICT") {
            self.strict = parse_flag("NETPROV_STRICT", &v)?;
        }
        if let Some(v) = lookup("NETPROV_NETMASK_OVERRIDE") {
            self.netmask_override = if v.is_empty() {
                None
            } else {
                Some(parse("NETPROV_NETMASK_OVERRIDE", &v)?)
            };
        }
        if let Some(v) = lookup("NETPROV_STATE_FILE") {
            self.state_file = Some(PathBuf::from(v)).filter(|p| !p.as_os_str().is_empty());
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        if self.request_timeout_secs == 0 {
            return Err(ProvisionError::InvalidConfig(
                "request timeout must be at least one second".to_string(),
            ));
        }
        if self.default_tenant.is_empty() {
            return Err(ProvisionError::InvalidConfig("default tenant must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn netctl_url(&self) -> String {
        format!("http://{}:{}", self.netctl_host, self.netctl_port)
    }

    pub fn ipam_url(&self) -> String {
        format!("http://{}:{}", self.ipam_host, self.ipam_port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn read_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.read_retry_backoff_ms)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ProvisionError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ProvisionError::InvalidConfig(format!("{}={}: {}", key, value, e)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ProvisionError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ProvisionError::InvalidConfig(format!("{}={}: expected a boolean", key, value))),
    }
}
