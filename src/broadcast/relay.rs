//! Echo relay: best-effort fan-out of a message to a group

use std::sync::Arc;

use tracing::{debug, warn};

use super::{BroadcastGroup, BroadcastRegistry};
use crate::types::{DeliveryFailure, DeliveryReport, PushMessage, PushResult};

/// Deliver `message` to every current member of `group`.
///
/// Membership is snapshotted first so no group lock is held while queueing.
/// A failure for one member is logged and recorded, and delivery continues
/// with the rest.
pub fn broadcast(group: &BroadcastGroup, message: &PushMessage) -> DeliveryReport {
    let members = group.snapshot();
    let mut report = DeliveryReport::empty(group.name());
    report.attempted = members.len();

    for member in members {
        match member.deliver(message.clone()) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                warn!(
                    group = group.name(),
                    connection = %member.id(),
                    error = %e,
                    "Dropped message for one recipient"
                );
                report.failed.push(DeliveryFailure {
                    connection: member.id().clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        group = group.name(),
        sequence_id = message.sequence_id,
        attempted = report.attempted,
        delivered = report.delivered,
        "Broadcast complete"
    );
    report
}

/// Relays incoming messages to one configured group
#[derive(Clone)]
pub struct EchoRelay {
    registry: Arc<BroadcastRegistry>,
    group: String,
}

impl EchoRelay {
    pub fn new(registry: Arc<BroadcastRegistry>, group: impl Into<String>) -> Self {
        Self {
            registry,
            group: group.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Broadcast `body` to the relay group, creating it if needed
    pub fn relay(&self, body: &str) -> PushResult<DeliveryReport> {
        let group = self.registry.lookup_or_create(&self.group)?;
        Ok(group.broadcast(body))
    }
}
