//! Multicast socket creation.

use std::net::{Ipv4Addr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::Result;
use crate::net::InterfaceInfo;

/// Create a multicast UDP socket joined to `group` on one interface.
///
/// The socket is configured for:
/// - UDP multicast reception on `port` (`port = 0` requests an OS-assigned
///   ephemeral port)
/// - Membership in `group` on the given interface, which is also the
///   outgoing multicast interface
/// - Multicast loop disabled (don't receive our own packets)
/// - Address reuse enabled (multiple listeners)
/// - Non-blocking mode
pub fn create_multicast_socket(
    interface: &InterfaceInfo,
    group: Ipv4Addr,
    port: u16,
) -> Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    // Allow address reuse
    socket.set_reuse_address(true)?;

    // On Linux, also set SO_REUSEPORT
    #[cfg(target_os = "linux")]
    socket.set_reuse_port(true)?;

    // Bind to the requested port on all interfaces
    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&bind_addr.into())?;

    // Join the multicast group on this interface
    socket.join_multicast_v4(&group, &interface.addr)?;

    // Disable multicast loopback
    socket.set_multicast_loop_v4(false)?;

    // Set multicast interface for outgoing packets
    socket.set_multicast_if_v4(&interface.addr)?;

    // Set TTL for multicast packets
    socket.set_multicast_ttl_v4(255)?;

    // Set non-blocking mode for async operation
    socket.set_nonblocking(true)?;

    Ok(socket)
}

/// The port a socket actually bound to, for OS-assigned ports.
pub fn bound_port(socket: &Socket) -> Result<u16> {
    let addr = socket.local_addr()?;
    let port = addr.as_socket_ipv4().map(|a| a.port()).unwrap_or(0);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: Multicast socket creation requires network capabilities and may
    // fail in restricted environments (containers, sandboxes, etc.), so
    // these tests stick to plain sockets.

    #[test]
    fn test_bound_port_readback() {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        let bind_addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0);
        socket.bind(&bind_addr.into()).unwrap();

        let port = bound_port(&socket).unwrap();
        assert_ne!(port, 0);
    }
}
