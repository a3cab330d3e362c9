//! Registry of open client connections and broadcast fan-out.
//!
//! Each connection task owns the WebSocket sink and drains an unbounded
//! outbox; the registry only holds the sending half. One mutex guards
//! insert, remove and broadcast.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use versync_core::Message;

/// Opaque handle for one open connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A frame queued for a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

struct Peer {
    addr: SocketAddr,
    outbox: mpsc::UnboundedSender<Outbound>,
}

/// Shared set of open connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: Mutex<HashMap<ConnectionId, Peer>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn peers(&self) -> MutexGuard<'_, HashMap<ConnectionId, Peer>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a newly opened connection. The caller drains the returned
    /// receiver into the socket.
    pub fn open(&self, addr: SocketAddr) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (outbox, rx) = mpsc::unbounded_channel();
        self.peers().insert(id, Peer { addr, outbox });
        (id, rx)
    }

    /// Forget a closed connection. Dropping its outbox ends the writer.
    pub fn close(&self, id: ConnectionId) -> bool {
        self.peers().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.peers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers().is_empty()
    }

    /// Queue a reply for one connection.
    pub fn send(&self, id: ConnectionId, message: &Message) -> bool {
        match self.peers().get(&id) {
            Some(peer) => peer.outbox.send(Outbound::Text(message.serialize())).is_ok(),
            None => false,
        }
    }

    /// Serialize `message` once and queue it for every open connection.
    ///
    /// A failing peer is logged and skipped. Returns how many peers the
    /// message was queued for.
    pub fn broadcast(&self, message: &Message) -> usize {
        let text = message.serialize();
        let peers = self.peers();
        let mut delivered = 0;
        for (id, peer) in peers.iter() {
            match peer.outbox.send(Outbound::Text(text.clone())) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::warn!("broadcast to {} ({}) failed: writer gone", id, peer.addr),
            }
        }
        delivered
    }

    /// Ask every connection to close and forget them all.
    pub fn close_all(&self) -> usize {
        let mut peers = self.peers();
        for peer in peers.values() {
            let _ = peer.outbox.send(Outbound::Close);
        }
        let closed = peers.len();
        peers.clear();
        closed
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("open", &self.len())
            .finish()
    }
}
