//! Network interface and socket handling.

pub mod interface;
pub mod socket;

pub use interface::{get_ipv4_address, InterfaceInfo};
pub use socket::{bound_port, create_multicast_socket};
