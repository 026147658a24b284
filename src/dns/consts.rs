//! Constants and enums shared by the DNS walker and the forwarders.

use std::net::Ipv4Addr;

/// Package name.
pub const PACKAGE: &str = "mcast-relay";

/// mDNS multicast address.
pub const MDNS_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// mDNS port.
pub const MDNS_PORT: u16 = 5353;

/// SSDP multicast address.
pub const SSDP_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// SSDP port.
pub const SSDP_PORT: u16 = 1900;

/// Receive buffer size, large enough for any UDP datagram.
pub const PACKET_SIZE: usize = 65536;

/// Largest DNS-over-UDP message the rewriter will touch. Anything bigger
/// is relayed opaquely.
pub const DNS_MAX_UDP_SIZE: usize = 4096;

/// RCODE value for a successful response.
pub const RCODE_NOERROR: u8 = 0;

/// DNS record types relevant to address rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    PTR,
    TXT,
    AAAA,
    SRV,
    /// Unknown record type with raw value.
    Unknown(u16),
}

impl RecordType {
    /// Convert from a raw u16 value.
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            12 => RecordType::PTR,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            33 => RecordType::SRV,
            _ => RecordType::Unknown(value),
        }
    }

    /// Convert to raw u16 value.
    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::PTR => 12,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::Unknown(v) => v,
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        value.to_u16()
    }
}
