//! Live connection membership
//!
//! Tracks every accepted viewer connection. The registry only stores
//! bookkeeping (id, peer, liveness timestamps, a cancel token); the socket
//! itself is owned by the connection's pump task. The write lock is held
//! for map mutations only, never across I/O.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// One accepted viewer connection
#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) id: u64,
    pub(crate) peer: SocketAddr,
    pub(crate) connected_at: Instant,
    last_seen: Mutex<Instant>,
    /// Cancelled by `close_all` to stop the pump task
    pub(crate) cancel: CancellationToken,
}

impl Connection {
    fn new(id: u64, peer: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer,
            connected_at: now,
            last_seen: Mutex::new(now),
            cancel: CancellationToken::new(),
        }
    }

    /// Record inbound activity
    pub(crate) fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the viewer was last heard from
    pub(crate) fn idle(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

/// Membership set for live connections
#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    connections: RwLock<HashMap<u64, Arc<Connection>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl ConnectionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Admit a connection, or refuse it when the registry is closed or at
    /// `limit` members
    ///
    /// The closed flag is read and written under the write lock, so no
    /// connection can slip in during `close_all`.
    pub(crate) fn register(&self, peer: SocketAddr, limit: usize) -> Option<Arc<Connection>> {
        let mut connections = self.connections.write();
        if self.closed.load(Ordering::Relaxed) || connections.len() >= limit {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let connection = Arc::new(Connection::new(id, peer));
        connections.insert(id, Arc::clone(&connection));
        Some(connection)
    }

    /// Drop a connection from the set. Idempotent.
    pub(crate) fn deregister(&self, id: u64) -> bool {
        self.connections.write().remove(&id).is_some()
    }

    pub(crate) fn count(&self) -> usize {
        self.connections.read().len()
    }

    /// Refuse new registrations and cancel every live pump task
    ///
    /// The tokens are cancelled outside the lock; each pump deregisters
    /// itself on its way out.
    pub(crate) fn close_all(&self) {
        let connections: Vec<_> = {
            let guard = self.connections.write();
            self.closed.store(true, Ordering::Relaxed);
            guard.values().cloned().collect()
        };
        for connection in connections {
            connection.cancel.cancel();
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
