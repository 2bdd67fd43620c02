//! Resource lifecycle listeners
//!
//! A [`ResourceListener`] is notified as connections move through their
//! lifecycle. Every method has a no-op default, so a listener only
//! implements the events it cares about.

mod connected_users;

pub use connected_users::{ConnectedUsers, CONNECTED_USERS};

use std::sync::Arc;

use crate::connection::Connection;
use crate::types::{DisconnectCause, Transport};

/// Callbacks fired by the connection handler
pub trait ResourceListener: Send + Sync {
    /// A connection's channel is established and waiting for pushes.
    /// Fired once per logical session.
    fn on_suspend(&self, _connection: &Arc<Connection>) {}

    /// A live session re-attached a channel or handled a request
    fn on_resume(&self, _connection: &Arc<Connection>) {}

    /// The connection was closed and removed from every group
    fn on_disconnect(&self, _connection: &Arc<Connection>, _cause: DisconnectCause) {}

    /// A client sent a message. `connection` is `None` for a POST that did
    /// not identify a live session.
    fn on_message(
        &self,
        _connection: Option<&Arc<Connection>>,
        _transport: Transport,
        _payload: &str,
    ) {
    }
}
