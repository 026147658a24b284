//! DNS message walking and address rewriting.

pub mod consts;
pub mod parser;
pub mod rewrite;

pub use consts::{
    RecordType, DNS_MAX_UDP_SIZE, MDNS_GROUP, MDNS_PORT, PACKAGE, PACKET_SIZE, SSDP_GROUP,
    SSDP_PORT,
};
pub use parser::{DnsHeader, RawRecord, RecordIter};
pub use rewrite::AddressRewriter;
