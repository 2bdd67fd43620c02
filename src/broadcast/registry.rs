//! Name-keyed registry of broadcast groups

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use super::BroadcastGroup;
use crate::connection::Connection;
use crate::types::{PushError, PushResult};

/// Membership summary for one group
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub name: String,
    pub members: usize,
    pub sequence_id: u64,
}

/// Registry of broadcast groups owned by the server process.
///
/// Groups are created lazily on first lookup and live until the registry
/// is shut down.
pub struct BroadcastRegistry {
    groups: RwLock<HashMap<String, Arc<BroadcastGroup>>>,
    shut_down: AtomicBool,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Return the group called `name`, creating an empty one if absent
    pub fn lookup_or_create(&self, name: &str) -> PushResult<Arc<BroadcastGroup>> {
        if self.is_shut_down() {
            return Err(PushError::RegistryShutdown);
        }

        if let Some(group) = self.groups.read().get(name) {
            return Ok(Arc::clone(group));
        }

        let mut groups = self.groups.write();
        // Re-checked under the write lock; shutdown clears the map while holding it
        if self.is_shut_down() {
            return Err(PushError::RegistryShutdown);
        }
        let group = groups.entry(name.to_string()).or_insert_with(|| {
            debug!(group = name, "Created broadcast group");
            Arc::new(BroadcastGroup::new(name))
        });
        Ok(Arc::clone(group))
    }

    /// Return the group called `name` if it exists
    pub fn lookup(&self, name: &str) -> Option<Arc<BroadcastGroup>> {
        self.groups.read().get(name).cloned()
    }

    /// Remove a connection from every group. Returns the number of groups
    /// it was removed from.
    pub fn remove_from_all(&self, connection: &Arc<Connection>) -> usize {
        let groups: Vec<Arc<BroadcastGroup>> = self.groups.read().values().cloned().collect();
        groups.iter().filter(|g| g.remove(connection)).count()
    }

    /// Names of all groups, sorted
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Per-group membership counts, sorted by name
    pub fn stats(&self) -> Vec<GroupStats> {
        let mut stats: Vec<GroupStats> = self
            .groups
            .read()
            .values()
            .map(|g| GroupStats {
                name: g.name().to_string(),
                members: g.len(),
                sequence_id: g.current_sequence_id(),
            })
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Refuse further lookups and drop every group
    pub fn shutdown(&self) {
        let mut groups = self.groups.write();
        self.shut_down.store(true, Ordering::SeqCst);
        for group in groups.values() {
            group.clear();
        }
        let count = groups.len();
        groups.clear();
        info!(groups = count, "Broadcast registry shut down");
    }
}

impl Default for BroadcastRegistry {
    fn default() -> Self {
        Self::new()
    }
}
