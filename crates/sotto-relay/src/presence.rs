//! Online-user presence registry.
//!
//! Maps each authenticated identity to its live connection handle. The
//! registry is an injected component, not ambient state: the relay and the
//! WebSocket layer both receive a clone.
//!
//! At most one connection per identity. A later connect for the same
//! identity displaces the earlier one; `register` hands the displaced
//! handle back so the caller can tell the old connection its session was
//! replaced instead of leaving a split-brain delivery target behind.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::debug;
use uuid::Uuid;

use sotto_shared::protocol::ServerFrame;
use sotto_shared::types::Identity;

/// Handle to one live, authenticated connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServerFrame>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Push a frame to the connection's outbound queue.
    /// Returns `false` if the connection task is gone.
    pub fn push(&self, frame: ServerFrame) -> bool {
        self.tx.send(frame).is_ok()
    }
}

/// Tracks all currently online identities.
#[derive(Clone, Default)]
pub struct PresenceDirectory {
    inner: Arc<Mutex<HashMap<Identity, ConnectionHandle>>>,
}

impl PresenceDirectory {
    /// Create a new, empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for an identity.
    ///
    /// Last connection wins: returns the handle this registration
    /// displaced, if any, so the caller can close it.
    pub async fn register(
        &self,
        identity: Identity,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let mut map = self.inner.lock().await;
        debug!(identity = %identity, connection = %handle.id(), "registering connection");
        map.insert(identity, handle)
    }

    /// Remove an identity's entry, but only if it still belongs to the
    /// given connection. A displaced connection's late cleanup must not
    /// evict its successor.
    pub async fn unregister(&self, identity: &Identity, connection_id: Uuid) -> bool {
        let mut map = self.inner.lock().await;
        match map.get(identity) {
            Some(current) if current.id() == connection_id => {
                map.remove(identity);
                debug!(identity = %identity, connection = %connection_id, "unregistered connection");
                true
            }
            _ => false,
        }
    }

    /// Look up the live connection for an identity.
    pub async fn lookup(&self, identity: &Identity) -> Option<ConnectionHandle> {
        self.inner.lock().await.get(identity).cloned()
    }

    /// Whether an identity currently has a live connection.
    pub async fn is_online(&self, identity: &Identity) -> bool {
        self.inner.lock().await.contains_key(identity)
    }

    /// Number of online identities.
    pub async fn online_count(&self) -> usize {
        self.inner.lock().await.len()
    }
}
