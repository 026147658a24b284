//! Ephemeral session endpoints and the bounded session table.

use std::net::SocketAddrV4;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::forwarder::endpoint::SocketEndpoint;

/// Maximum number of live sessions per forwarder.
pub const MAX_SESSIONS: usize = 4;

/// Idle time after which a session is swept.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// An ephemeral LAN-side endpoint carrying one request/response exchange.
pub struct SessionEndpoint {
    endpoint: SocketEndpoint,
    peer_addr: SocketAddrV4,
    last_used: Instant,
}

impl SessionEndpoint {
    /// Create a session around a freshly bound LAN-side endpoint.
    pub fn new(endpoint: SocketEndpoint, peer_addr: SocketAddrV4, now: Instant) -> Self {
        Self {
            endpoint,
            peer_addr,
            last_used: now,
        }
    }

    /// The LAN-side socket.
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Internal-side originator replies are relayed to. Set once at
    /// creation.
    pub fn peer_addr(&self) -> SocketAddrV4 {
        self.peer_addr
    }

    /// When the session last relayed a packet in either direction.
    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    /// Record use of the session for idle tracking.
    pub fn touch(&mut self, now: Instant) {
        self.last_used = now;
    }
}

/// Bounded, newest-first table of ephemeral session endpoints.
///
/// Eviction is size-triggered at insertion only; lookups never reorder or
/// trim the table, so the policy approximates LRU rather than enforcing it.
#[derive(Default)]
pub struct SessionTable {
    entries: Vec<SessionEndpoint>,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate sessions, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &SessionEndpoint> {
        self.entries.iter()
    }

    /// Match a readable socket to its session.
    pub fn find_by_socket(&mut self, fd: RawFd) -> Option<&mut SessionEndpoint> {
        self.entries
            .iter_mut()
            .find(|entry| entry.endpoint.raw_fd() == fd)
    }

    /// Match an internal-side source port to an existing session.
    pub fn find_by_peer_port(&mut self, port: u16) -> Option<&mut SessionEndpoint> {
        self.entries
            .iter_mut()
            .find(|entry| entry.peer_addr.port() == port)
    }

    /// Whether a session owns the given socket.
    pub fn contains_socket(&self, fd: RawFd) -> bool {
        self.entries.iter().any(|entry| entry.endpoint.raw_fd() == fd)
    }

    /// Whether a session remembers the given internal-side source port.
    pub fn contains_peer_port(&self, port: u16) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.peer_addr.port() == port)
    }

    /// Prepend a new session, then drop from the tail while over capacity.
    /// Dropping an entry closes its socket.
    pub fn insert(&mut self, entry: SessionEndpoint) {
        self.entries.insert(0, entry);
        while self.entries.len() > MAX_SESSIONS {
            if let Some(evicted) = self.entries.pop() {
                debug!(peer = %evicted.peer_addr(), "evicting oldest session");
            }
        }
    }

    /// Remove every session idle longer than `idle`.
    pub fn sweep(&mut self, now: Instant, idle: Duration) {
        self.entries.retain(|entry| {
            let keep = now.duration_since(entry.last_used) <= idle;
            if !keep {
                debug!(peer = %entry.peer_addr(), "sweeping idle session");
            }
            keep
        });
    }
}
