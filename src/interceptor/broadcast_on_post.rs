//! Echoes every client message to the relay group

use tracing::warn;

use super::{Interceptor, PushRequest, RequestKind};
use crate::broadcast::EchoRelay;

pub struct BroadcastOnPost {
    relay: EchoRelay,
}

impl BroadcastOnPost {
    pub fn new(relay: EchoRelay) -> Self {
        Self { relay }
    }
}

impl Interceptor for BroadcastOnPost {
    fn name(&self) -> &'static str {
        "broadcast-on-post"
    }

    fn post_inspect(&self, request: &mut PushRequest) {
        if request.kind != RequestKind::Message {
            return;
        }
        // Empty bodies are keep-alive noise, not messages
        let Some(body) = request.body.as_deref().filter(|b| !b.is_empty()) else {
            return;
        };

        match self.relay.relay(body) {
            Ok(report) => request.relayed = Some(report),
            Err(e) => {
                warn!(group = self.relay.group(), error = %e, "Relay failed");
                request.relay_error = Some(e);
            }
        }
    }
}
