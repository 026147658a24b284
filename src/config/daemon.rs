//! Daemon and forwarder configuration.

use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dns::consts::{MDNS_GROUP, MDNS_PORT, SSDP_GROUP, SSDP_PORT};
use crate::error::{Error, Result};

/// One multicast group/port pair to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForwarderSpec {
    /// Multicast group address.
    pub group: Ipv4Addr,
    /// UDP port.
    pub port: u16,
}

impl ForwarderSpec {
    /// mDNS (224.0.0.251:5353).
    pub const MDNS: ForwarderSpec = ForwarderSpec {
        group: MDNS_GROUP,
        port: MDNS_PORT,
    };

    /// SSDP (239.255.255.250:1900).
    pub const SSDP: ForwarderSpec = ForwarderSpec {
        group: SSDP_GROUP,
        port: SSDP_PORT,
    };
}

fn default_allow_stateless() -> bool {
    true
}

fn default_forwarders() -> Vec<ForwarderSpec> {
    vec![ForwarderSpec::MDNS, ForwarderSpec::SSDP]
}

/// Daemon configuration, loadable from a YAML file. Interface names and
/// the guest address come from the CLI and override file values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Guest address rewritten inside DNS answers. Absent disables
    /// rewriting entirely.
    #[serde(default)]
    pub guest_addr: Option<Ipv4Addr>,

    /// Whether well-known-port traffic is relayed without session state.
    #[serde(default = "default_allow_stateless")]
    pub allow_stateless: bool,

    /// Multicast group/port pairs to bridge.
    #[serde(default = "default_forwarders")]
    pub forwarders: Vec<ForwarderSpec>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            guest_addr: None,
            allow_stateless: default_allow_stateless(),
            forwarders: default_forwarders(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.forwarders.is_empty() {
            return Err(Error::Config("no forwarders configured".to_string()));
        }
        for spec in &self.forwarders {
            if !spec.group.is_multicast() {
                return Err(Error::Config(format!(
                    "not a multicast address: {}",
                    spec.group
                )));
            }
            if spec.port == 0 {
                return Err(Error::Config(format!(
                    "invalid port for group {}",
                    spec.group
                )));
            }
        }
        Ok(())
    }

    /// Expand into one immutable per-forwarder config per group/port pair.
    pub fn forwarder_configs(
        &self,
        internal_ifname: &str,
        lan_ifname: &str,
    ) -> Vec<ForwarderConfig> {
        self.forwarders
            .iter()
            .map(|spec| ForwarderConfig {
                internal_ifname: internal_ifname.to_string(),
                lan_ifname: lan_ifname.to_string(),
                group: spec.group,
                port: spec.port,
                guest_addr: self.guest_addr,
                allow_stateless: self.allow_stateless,
            })
            .collect()
    }
}

/// Configuration of one forwarder instance. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Interface facing the guest network.
    pub internal_ifname: String,
    /// Interface facing the LAN.
    pub lan_ifname: String,
    /// Multicast group address.
    pub group: Ipv4Addr,
    /// UDP port.
    pub port: u16,
    /// Guest address rewritten inside DNS answers, if any.
    pub guest_addr: Option<Ipv4Addr>,
    /// Whether well-known-port traffic is relayed without session state.
    pub allow_stateless: bool,
}
