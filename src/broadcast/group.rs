//! A named set of subscribed connections

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::relay;
use crate::connection::Connection;
use crate::types::{ConnectionId, DeliveryReport, PushMessage};

/// Broadcast group: every member receives each message broadcast to it
pub struct BroadcastGroup {
    name: String,
    members: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
    sequence_counter: AtomicU64,
}

impl BroadcastGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: RwLock::new(HashMap::new()),
            sequence_counter: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a connection. Closed connections are refused.
    ///
    /// Returns `&Self` so a join can be chained into a broadcast.
    pub fn add(&self, connection: Arc<Connection>) -> &Self {
        // Checked under the write lock: a close that lands after the check
        // has its removal wait for this insert.
        let mut members = self.members.write();
        if !connection.is_closed() {
            members.insert(connection.id().clone(), connection);
        }
        self
    }

    /// Remove `connection` if it is the member registered under its id.
    /// A newer session reusing the id is left in place.
    pub fn remove(&self, connection: &Arc<Connection>) -> bool {
        let mut members = self.members.write();
        match members.get(connection.id()) {
            Some(current) if Arc::ptr_eq(current, connection) => {
                members.remove(connection.id());
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.members.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Copy of the current membership; the lock is released on return
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.members.read().values().cloned().collect()
    }

    /// Ids of current members, sorted
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.members.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop every member without closing them
    pub fn clear(&self) {
        self.members.write().clear();
    }

    /// Get the current sequence ID
    pub fn current_sequence_id(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }

    /// Broadcast a text body to every current member
    pub fn broadcast(&self, body: impl Into<String>) -> DeliveryReport {
        let message = PushMessage {
            group: self.name.clone(),
            body: body.into(),
            sequence_id: self.sequence_counter.fetch_add(1, Ordering::SeqCst),
            timestamp: chrono::Utc::now().timestamp(),
        };
        relay::broadcast(self, &message)
    }
}

impl std::fmt::Debug for BroadcastGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastGroup")
            .field("name", &self.name)
            .field("members", &self.len())
            .finish()
    }
}
