//! mcast-relay - a multicast forwarding daemon.
//!
//! Bridges mDNS/SSDP service discovery between a sandboxed guest's virtual
//! network interface and the host's LAN interface, rewriting guest
//! addresses embedded in DNS answers so they stay reachable from the LAN.

pub mod config;
pub mod dns;
pub mod error;
pub mod forwarder;
pub mod net;

pub use config::{DaemonConfig, ForwarderConfig, ForwarderSpec};
pub use dns::{
    AddressRewriter, DnsHeader, RawRecord, RecordIter, RecordType, DNS_MAX_UDP_SIZE, MDNS_GROUP,
    MDNS_PORT, PACKAGE, PACKET_SIZE, SSDP_GROUP, SSDP_PORT,
};
pub use error::{Error, Result};
pub use forwarder::{Forwarder, SessionEndpoint, SessionTable, SocketEndpoint};
pub use net::{get_ipv4_address, InterfaceInfo};
