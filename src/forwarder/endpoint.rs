//! Multicast socket endpoints.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::fd::{AsRawFd, RawFd};

use socket2::{SockAddr, Socket};
use tokio::io::unix::{AsyncFd, AsyncFdReadyGuard};

use crate::error::Result;
use crate::net::{self, InterfaceInfo};

/// A bound multicast UDP socket on one named interface.
///
/// The two fixed endpoints of a forwarder live for the process lifetime;
/// ephemeral session endpoints are owned by the session table and closed
/// on eviction.
pub struct SocketEndpoint {
    inner: AsyncFd<Socket>,
    info: InterfaceInfo,
    group: Ipv4Addr,
    bound_port: u16,
}

impl SocketEndpoint {
    /// Bind a multicast socket on `ifname`, joined to `group`. `port = 0`
    /// requests an OS-assigned ephemeral port.
    ///
    /// Fails cleanly when the interface has no usable IPv4 address.
    pub fn bind(ifname: &str, group: Ipv4Addr, port: u16) -> Result<Self> {
        let info = InterfaceInfo::from_name(ifname)?;
        let socket = net::create_multicast_socket(&info, group, port)?;
        let bound_port = net::bound_port(&socket)?;
        let inner = AsyncFd::new(socket)?;

        Ok(Self {
            inner,
            info,
            group,
            bound_port,
        })
    }

    /// Wrap an already-bound socket. Unit tests cannot join multicast
    /// groups in restricted environments, so they supply plain sockets.
    #[cfg(test)]
    pub(crate) fn from_socket(socket: Socket, ifname: &str, group: Ipv4Addr) -> Result<Self> {
        let bound_port = net::bound_port(&socket)?;
        let info = InterfaceInfo::new(
            ifname.to_string(),
            Ipv4Addr::LOCALHOST,
            Ipv4Addr::new(255, 0, 0, 0),
        );
        let inner = AsyncFd::new(socket)?;

        Ok(Self {
            inner,
            info,
            group,
            bound_port,
        })
    }

    /// Get the owning interface name.
    pub fn ifname(&self) -> &str {
        &self.info.ifname
    }

    /// Get the owning interface.
    pub fn interface(&self) -> &InterfaceInfo {
        &self.info
    }

    /// Get the joined multicast group.
    pub fn group(&self) -> Ipv4Addr {
        self.group
    }

    /// Get the port the socket actually bound to.
    pub fn bound_port(&self) -> u16 {
        self.bound_port
    }

    /// Get the raw file descriptor identifying this endpoint.
    pub fn raw_fd(&self) -> RawFd {
        self.inner.get_ref().as_raw_fd()
    }

    /// Wait until the socket is reported readable.
    pub async fn readable(&self) -> io::Result<AsyncFdReadyGuard<'_, Socket>> {
        self.inner.readable().await
    }

    /// Fire-and-forget UDP send.
    pub fn send_to(&self, data: &[u8], dest: SocketAddrV4) -> io::Result<usize> {
        self.inner.get_ref().send_to(data, &SockAddr::from(dest))
    }
}

impl std::fmt::Display for SocketEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} group {}:{}", self.info, self.group, self.bound_port)
    }
}
