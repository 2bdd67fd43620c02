//! Presence listener: announces new connections to a presence group

use std::sync::Arc;

use tracing::{info, warn};

use super::ResourceListener;
use crate::broadcast::BroadcastRegistry;
use crate::connection::Connection;
use crate::types::{DisconnectCause, Transport};

/// Default presence group name
pub const CONNECTED_USERS: &str = "Connected users";

/// Joins each new connection to the presence group and tells every member
/// about it. Logs how each connection went away.
pub struct ConnectedUsers {
    registry: Arc<BroadcastRegistry>,
    group: String,
}

impl ConnectedUsers {
    pub fn new(registry: Arc<BroadcastRegistry>) -> Self {
        Self::with_group(registry, CONNECTED_USERS)
    }

    pub fn with_group(registry: Arc<BroadcastRegistry>, group: impl Into<String>) -> Self {
        Self {
            registry,
            group: group.into(),
        }
    }

    /// Text of the notice sent when `id` joins
    pub fn join_notice(id: &impl std::fmt::Display) -> String {
        format!("Browser UUID: {} connected.", id)
    }
}

impl ResourceListener for ConnectedUsers {
    fn on_suspend(&self, connection: &Arc<Connection>) {
        info!(connection = %connection.id(), transport = %connection.transport(), "Received GET");

        match self.registry.lookup_or_create(&self.group) {
            Ok(group) => {
                group
                    .add(Arc::clone(connection))
                    .broadcast(Self::join_notice(connection.id()));
            }
            Err(e) => {
                warn!(group = %self.group, error = %e, "Could not announce connection");
            }
        }
    }

    fn on_disconnect(&self, connection: &Arc<Connection>, cause: DisconnectCause) {
        match cause {
            DisconnectCause::Cancelled => {
                info!(connection = %connection.id(), "User unexpectedly disconnected");
            }
            DisconnectCause::ClosedByClient => {
                info!(connection = %connection.id(), "User closed the connection");
            }
            DisconnectCause::ServerShutdown => {
                info!(connection = %connection.id(), "User disconnected by server shutdown");
            }
        }

        if let Some(group) = self.registry.lookup(&self.group) {
            group.remove(connection);
        }
    }

    fn on_message(
        &self,
        connection: Option<&Arc<Connection>>,
        transport: Transport,
        payload: &str,
    ) {
        let sender = connection
            .map(|c| c.id().to_string())
            .unwrap_or_else(|| "-".to_string());
        info!(
            connection = %sender,
            transport = %transport,
            bytes = payload.len(),
            "POST received"
        );
    }
}
