//! Table of live connections keyed by id

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Connection, Subscription};
use crate::types::{ConnectionId, Transport};

/// Live connections owned by the connection handler
pub struct ConnectionTable {
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Re-attach a channel to the live session `id`, or open a new session
    /// under that id. The lookup and the insert share one write lock, so
    /// concurrent opens of the same id end up on the same connection.
    ///
    /// A closed entry still in the table is being torn down; it is replaced,
    /// and its own `remove_if_same` then leaves the new session alone.
    pub fn open_or_reattach(
        &self,
        id: ConnectionId,
        transport: Transport,
        capacity: usize,
    ) -> Subscription {
        let mut connections = self.connections.write();
        if let Some(live) = connections.get(&id) {
            if let Some(resumed) = live.reattach(transport) {
                return resumed;
            }
        }

        let fresh = Connection::open(id.clone(), transport, capacity);
        connections.insert(id, Arc::clone(&fresh.connection));
        fresh
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.read().get(id).cloned()
    }

    /// Remove `connection` only if the table still points at that exact
    /// instance. A newer session reusing the id is left alone.
    pub fn remove_if_same(&self, connection: &Arc<Connection>) -> bool {
        let mut connections = self.connections.write();
        match connections.get(connection.id()) {
            Some(current) if Arc::ptr_eq(current, connection) => {
                connections.remove(connection.id());
                true
            }
            _ => false,
        }
    }

    /// Snapshot of all live connections
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}
