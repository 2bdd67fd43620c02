//! Makes sure a session is announced only once.
//!
//! Clients that re-issue GET with their id (after a dropped stream, or on
//! every request) would otherwise trigger `on_suspend` each time.

use std::collections::HashSet;

use parking_lot::Mutex;

use super::{Action, Interceptor, PushRequest, RequestKind};
use crate::types::ConnectionId;

#[derive(Default)]
pub struct SuspendTracker {
    tracked: Mutex<HashSet<ConnectionId>>,
}

impl SuspendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracked(&self, id: &ConnectionId) -> bool {
        self.tracked.lock().contains(id)
    }
}

impl Interceptor for SuspendTracker {
    fn name(&self) -> &'static str {
        "suspend-tracker"
    }

    fn inspect(&self, request: &mut PushRequest) -> Action {
        if request.kind == RequestKind::Open {
            if let Some(connection) = &request.connection {
                if !self.tracked.lock().insert(connection.id().clone()) {
                    request.resumed = true;
                }
            }
        }
        Action::Continue
    }

    fn on_disconnect(&self, id: &ConnectionId) {
        self.tracked.lock().remove(id);
    }
}
