//! Pushed messages and broadcast delivery reports

use serde::{Deserialize, Serialize};

use super::ConnectionId;

/// A message pushed to one connection on behalf of a group
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushMessage {
    /// Name of the group the message was broadcast to
    pub group: String,

    /// Text payload, delivered verbatim
    pub body: String,

    /// Monotonically increasing per group, used as the SSE event id
    pub sequence_id: u64,

    /// Unix timestamp when the broadcast started
    pub timestamp: i64,
}

/// One failed delivery inside a broadcast
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub connection: ConnectionId,
    pub reason: String,
}

/// Outcome of broadcasting a message to a group
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub group: String,
    pub attempted: usize,
    pub delivered: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn empty(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..Self::default()
        }
    }
}
