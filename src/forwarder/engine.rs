//! Per-packet forwarding decisions and the forwarder event loop.

use std::future::Future;
use std::io;
use std::mem::MaybeUninit;
use std::net::SocketAddrV4;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::time::Instant;

use futures::future::select_all;
use socket2::Socket;
use tokio::io::unix::AsyncFdReadyGuard;
use tracing::{debug, error, info, warn};

use crate::config::ForwarderConfig;
use crate::dns::consts::PACKET_SIZE;
use crate::dns::AddressRewriter;
use crate::error::Result;
use crate::forwarder::endpoint::SocketEndpoint;
use crate::forwarder::session::{
    SessionEndpoint, SessionTable, SESSION_IDLE_TIMEOUT, SWEEP_INTERVAL,
};
use crate::net;

/// Identity of the socket a datagram arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PacketSource {
    Internal,
    Lan,
    Session(RawFd),
}

/// Outcome of the per-packet decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    /// Reply on an established session: relay unmodified to the session's
    /// internal-side peer.
    ReplyToPeer(RawFd),
    /// Repeated request on an established session: rewrite, then send via
    /// the session's LAN socket.
    ForwardOnSession(u16),
    /// Stateless well-known-port traffic from the guest side.
    StatelessToLan,
    /// Stateless well-known-port traffic from the LAN side.
    StatelessToInternal,
    /// First packet of a new exchange: open a session.
    OpenSession,
    /// Nothing matched.
    Drop,
}

/// Classify a datagram into its forwarding path.
///
/// Order matters: established sessions win over the stateless path, and
/// only guest-side traffic may open a session.
fn decide(
    sessions: &SessionTable,
    config: &ForwarderConfig,
    source: PacketSource,
    from: SocketAddrV4,
) -> Decision {
    if let PacketSource::Session(fd) = source {
        return if sessions.contains_socket(fd) {
            Decision::ReplyToPeer(fd)
        } else {
            Decision::Drop
        };
    }

    let from_internal = source == PacketSource::Internal;

    if from_internal && sessions.contains_peer_port(from.port()) {
        return Decision::ForwardOnSession(from.port());
    }

    if config.allow_stateless && from.port() == config.port {
        return if from_internal {
            Decision::StatelessToLan
        } else {
            Decision::StatelessToInternal
        };
    }

    if from_internal {
        Decision::OpenSession
    } else {
        Decision::Drop
    }
}

enum Event {
    Sweep,
    Shutdown,
    Packet {
        source: PacketSource,
        len: usize,
        from: SocketAddrV4,
    },
}

type ReadableFuture<'a> =
    Pin<Box<dyn Future<Output = io::Result<AsyncFdReadyGuard<'a, Socket>>> + 'a>>;

/// Bridges one multicast group/port pair between the internal and LAN
/// interfaces.
///
/// Owns the two fixed endpoints, the ephemeral session table, and the
/// optional address rewriter; all of it is driven serially from `run`, so
/// no locking is involved.
pub struct Forwarder {
    config: ForwarderConfig,
    internal: SocketEndpoint,
    lan: SocketEndpoint,
    sessions: SessionTable,
    rewriter: Option<AddressRewriter>,
}

impl Forwarder {
    /// Bind the two fixed endpoints and construct the engine.
    pub fn new(config: ForwarderConfig) -> Result<Self> {
        let internal = SocketEndpoint::bind(&config.internal_ifname, config.group, config.port)?;
        let lan = SocketEndpoint::bind(&config.lan_ifname, config.group, config.port)?;

        info!("internal: {}", internal);
        info!("lan: {}", lan);

        let rewriter = config.guest_addr.map(AddressRewriter::new);

        Ok(Self {
            config,
            internal,
            lan,
            sessions: SessionTable::new(),
            rewriter,
        })
    }

    /// Get the forwarder's configuration.
    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Run the forwarder until shutdown.
    ///
    /// Serially dispatches socket readability, the periodic session sweep,
    /// and the shutdown signal onto this one task.
    pub async fn run(&mut self) -> Result<()> {
        let mut buf = vec![MaybeUninit::<u8>::uninit(); PACKET_SIZE];
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);

        info!(
            group = %self.config.group,
            port = self.config.port,
            "forwarding multicast traffic"
        );

        loop {
            let event = tokio::select! {
                _ = sweep.tick() => Event::Sweep,
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        error!("signal handler error: {}", err);
                    }
                    Event::Shutdown
                }
                event = Self::next_packet(&self.internal, &self.lan, &self.sessions, &mut buf) => event,
            };

            match event {
                Event::Sweep => self.sessions.sweep(Instant::now(), SESSION_IDLE_TIMEOUT),
                Event::Shutdown => {
                    info!("received shutdown signal");
                    break;
                }
                Event::Packet { source, len, from } => {
                    // Safety: recv_from initialized len bytes
                    let data: &mut [u8] = unsafe {
                        std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut u8, len)
                    };
                    self.handle_packet(source, data, from);
                }
            }
        }

        Ok(())
    }

    /// Wait for the next datagram on any owned socket.
    ///
    /// Races readiness across the two fixed endpoints and every live
    /// session socket, then receives without blocking. Transient receive
    /// errors are logged and the wait continues.
    async fn next_packet<'a>(
        internal: &'a SocketEndpoint,
        lan: &'a SocketEndpoint,
        sessions: &'a SessionTable,
        buf: &mut [MaybeUninit<u8>],
    ) -> Event {
        loop {
            let session_fds: Vec<RawFd> = sessions
                .iter()
                .map(|entry| entry.endpoint().raw_fd())
                .collect();

            let mut readables: Vec<ReadableFuture<'a>> =
                Vec::with_capacity(2 + session_fds.len());
            readables.push(Box::pin(internal.readable()));
            readables.push(Box::pin(lan.readable()));
            for entry in sessions.iter() {
                readables.push(Box::pin(entry.endpoint().readable()));
            }

            let (result, index, _remaining) = select_all(readables).await;

            let source = match index {
                0 => PacketSource::Internal,
                1 => PacketSource::Lan,
                n => PacketSource::Session(session_fds[n - 2]),
            };

            let mut guard = match result {
                Ok(guard) => guard,
                Err(err) => {
                    error!("poll error: {}", err);
                    continue;
                }
            };

            match guard.try_io(|inner| inner.get_ref().recv_from(buf)) {
                Ok(Ok((len, addr))) => {
                    if let Some(from) = addr.as_socket_ipv4() {
                        return Event::Packet { source, len, from };
                    }
                    // Non-IPv4 source, ignore
                }
                Ok(Err(err)) => warn!("receive error: {}", err),
                Err(_would_block) => {}
            }
        }
    }

    /// Execute the decision tree for one received datagram.
    fn handle_packet(&mut self, source: PacketSource, data: &mut [u8], from: SocketAddrV4) {
        let now = Instant::now();
        let group_dest = SocketAddrV4::new(self.config.group, self.config.port);

        match decide(&self.sessions, &self.config, source, from) {
            Decision::ReplyToPeer(fd) => {
                let Some(session) = self.sessions.find_by_socket(fd) else {
                    return;
                };
                session.touch(now);
                let peer = session.peer_addr();
                debug!(%from, %peer, "relaying session reply to internal");
                if let Err(err) = self.internal.send_to(data, peer) {
                    error!("send error on {}: {}", self.internal.ifname(), err);
                }
            }
            Decision::ForwardOnSession(peer_port) => {
                self.rewrite_guest_addr(data);
                let Some(session) = self.sessions.find_by_peer_port(peer_port) else {
                    return;
                };
                session.touch(now);
                debug!(
                    %from,
                    lan_port = session.endpoint().bound_port(),
                    "forwarding to LAN on existing session"
                );
                if let Err(err) = session.endpoint().send_to(data, group_dest) {
                    error!("send error on {}: {}", session.endpoint().ifname(), err);
                }
            }
            Decision::StatelessToLan => {
                // Resolved per packet to tolerate LAN reconfiguration
                let Some(lan_addr) = net::get_ipv4_address(&self.config.lan_ifname) else {
                    debug!(
                        "no IPv4 address on {}, dropping stateless packet",
                        self.config.lan_ifname
                    );
                    return;
                };
                if let Some(rewriter) = &self.rewriter {
                    let rewritten = rewriter.rewrite(data, lan_addr);
                    if rewritten > 0 {
                        debug!(count = rewritten, addr = %lan_addr, "rewrote guest A records");
                    }
                }
                debug!(%from, "stateless forward internal -> lan");
                if let Err(err) = self.lan.send_to(data, group_dest) {
                    error!("send error on {}: {}", self.lan.ifname(), err);
                }
            }
            Decision::StatelessToInternal => {
                debug!(%from, "stateless forward lan -> internal");
                if let Err(err) = self.internal.send_to(data, group_dest) {
                    error!("send error on {}: {}", self.internal.ifname(), err);
                }
            }
            Decision::OpenSession => self.open_session(data, from, now, group_dest),
            Decision::Drop => debug!(%from, ?source, "dropping unmatched packet"),
        }
    }

    /// Open a new LAN-side session for a guest request and relay its first
    /// packet.
    fn open_session(
        &mut self,
        data: &[u8],
        from: SocketAddrV4,
        now: Instant,
        group_dest: SocketAddrV4,
    ) {
        // Prefer the well-known port; fall back to an OS-assigned one
        let bound = SocketEndpoint::bind(&self.config.lan_ifname, self.config.group, self.config.port)
            .or_else(|_| SocketEndpoint::bind(&self.config.lan_ifname, self.config.group, 0));
        let endpoint = match bound {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(
                    "failed to bind session socket on {}: {}",
                    self.config.lan_ifname, err
                );
                return;
            }
        };

        debug!(%from, lan_port = endpoint.bound_port(), "opening session to LAN");

        // A session's first packet is the originator's own query and never
        // embeds the guest address, so it goes out unrewritten.
        if let Err(err) = endpoint.send_to(data, group_dest) {
            error!("send error on {}: {}", endpoint.ifname(), err);
        }

        self.sessions.insert(SessionEndpoint::new(endpoint, from, now));
    }

    /// Rewrite guest A records to the LAN's current address, when both are
    /// known.
    fn rewrite_guest_addr(&self, data: &mut [u8]) {
        let Some(rewriter) = &self.rewriter else {
            return;
        };
        let Some(lan_addr) = net::get_ipv4_address(&self.config.lan_ifname) else {
            return;
        };
        let rewritten = rewriter.rewrite(data, lan_addr);
        if rewritten > 0 {
            debug!(count = rewritten, addr = %lan_addr, "rewrote guest A records");
        }
    }
}
