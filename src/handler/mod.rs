//! Connection handler
//!
//! Owns the live connection table and drives each connection through its
//! lifecycle: open (GET), message (POST or WebSocket frame), disconnect.
//! Every step runs the interceptor chain and notifies the registered
//! listeners.
//!
//! All methods are synchronous. Delivery only queues onto bounded channels,
//! so they are safe to call from async tasks and from `Drop`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::broadcast::{BroadcastRegistry, EchoRelay};
use crate::config::Config;
use crate::connection::{Connection, ConnectionTable, Subscription};
use crate::interceptor::{
    BodyLimit, BroadcastOnPost, Interceptor, InterceptorChain, PushRequest, SuspendTracker,
};
use crate::listener::{ConnectedUsers, ResourceListener};
use crate::types::{ConnectionId, DeliveryReport, DisconnectCause, PushError, PushResult, Transport};

/// Drives connection lifecycles for one endpoint
pub struct ConnectionHandler {
    registry: Arc<BroadcastRegistry>,
    connections: ConnectionTable,
    chain: InterceptorChain,
    listeners: Vec<Arc<dyn ResourceListener>>,
    relay_group: String,
    queue_capacity: usize,
}

impl ConnectionHandler {
    /// Create a handler with an empty chain and no listeners
    pub fn new(
        registry: Arc<BroadcastRegistry>,
        relay_group: impl Into<String>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            registry,
            connections: ConnectionTable::new(),
            chain: InterceptorChain::new(),
            listeners: Vec::new(),
            relay_group: relay_group.into(),
            queue_capacity,
        }
    }

    /// Create the managed echo handler: suspend tracking, body limit and
    /// broadcast-on-post interceptors, plus the presence listener.
    pub fn with_defaults(config: &Config, registry: Arc<BroadcastRegistry>) -> Self {
        let mut handler = Self::new(
            Arc::clone(&registry),
            config.relay_group.clone(),
            config.queue_capacity,
        );

        let relay = EchoRelay::new(Arc::clone(&registry), config.relay_group.clone());
        handler
            .register_interceptor(Arc::new(SuspendTracker::new()))
            .register_interceptor(Arc::new(BodyLimit::new(config.max_body_bytes)))
            .register_interceptor(Arc::new(BroadcastOnPost::new(relay)));
        handler.register_listener(Arc::new(ConnectedUsers::with_group(
            registry,
            config.presence_group.clone(),
        )));
        handler
    }

    /// Append an interceptor to the chain
    pub fn register_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) -> &mut Self {
        self.chain.push(interceptor);
        self
    }

    /// Register a lifecycle listener
    pub fn register_listener(&mut self, listener: Arc<dyn ResourceListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    pub fn registry(&self) -> &Arc<BroadcastRegistry> {
        &self.registry
    }

    pub fn relay_group(&self) -> &str {
        &self.relay_group
    }

    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Open a channel, or re-attach one to a live session with `requested` id.
    ///
    /// The connection joins the relay group, is suspended, and listeners see
    /// `on_suspend` the first time a session is opened and `on_resume` after.
    pub fn open(
        &self,
        requested: Option<ConnectionId>,
        transport: Transport,
    ) -> PushResult<Subscription> {
        let relay_group = self.registry.lookup_or_create(&self.relay_group)?;

        let id = requested.unwrap_or_else(ConnectionId::generate);
        let subscription = self
            .connections
            .open_or_reattach(id, transport, self.queue_capacity);
        let connection = Arc::clone(&subscription.connection);

        let mut request = PushRequest::open(Arc::clone(&connection), transport);
        if let Err(e) = self.chain.inspect(&mut request) {
            self.disconnect(&connection, subscription.generation, DisconnectCause::Cancelled);
            return Err(e);
        }

        relay_group.add(Arc::clone(&connection));
        connection.suspend();

        if request.resumed {
            debug!(connection = %connection.id(), transport = %transport, "Session resumed");
            for listener in &self.listeners {
                listener.on_resume(&connection);
            }
        } else {
            info!(connection = %connection.id(), transport = %transport, "Connection suspended");
            for listener in &self.listeners {
                listener.on_suspend(&connection);
            }
        }

        self.chain.post_inspect(&mut request);
        Ok(subscription)
    }

    /// Handle a client message and relay it.
    ///
    /// `from` identifies the sender's session; an unknown or missing id is
    /// still relayed, attributed to no connection.
    pub fn message(
        &self,
        from: Option<&ConnectionId>,
        body: String,
        transport: Transport,
    ) -> PushResult<DeliveryReport> {
        let sender = from.and_then(|id| self.connections.get(id));
        let resumed = sender.as_ref().map(|c| c.resume()).unwrap_or(false);

        let mut request = PushRequest::message(sender.clone(), transport, body);
        let result = self.chain.inspect(&mut request).and_then(|()| {
            let payload = request.body.as_deref().unwrap_or_default();
            for listener in &self.listeners {
                listener.on_message(sender.as_ref(), transport, payload);
            }
            self.chain.post_inspect(&mut request);
            if let Some(e) = request.relay_error.take() {
                return Err(e);
            }
            Ok(request
                .relayed
                .take()
                .unwrap_or_else(|| DeliveryReport::empty(self.relay_group.clone())))
        });

        if resumed {
            if let Some(sender) = &sender {
                sender.suspend();
            }
        }
        result
    }

    /// Close a connection and remove it from every group.
    ///
    /// A call from a superseded transport generation is ignored, as is a
    /// second disconnect of the same connection.
    pub fn disconnect(&self, connection: &Arc<Connection>, generation: u64, cause: DisconnectCause) {
        if !connection.close_if_current(generation, cause) {
            debug!(
                connection = %connection.id(),
                generation,
                "Ignoring disconnect of closed or superseded channel"
            );
            return;
        }

        self.connections.remove_if_same(connection);
        let groups = self.registry.remove_from_all(connection);
        self.chain.on_disconnect(connection.id());

        debug!(
            connection = %connection.id(),
            cause = ?cause,
            graceful = cause.is_graceful(),
            groups,
            "Connection closed"
        );
        for listener in &self.listeners {
            listener.on_disconnect(connection, cause);
        }
    }

    /// Client-initiated close of the session `id`
    pub fn close(&self, id: &ConnectionId) -> PushResult<()> {
        let connection = self
            .connections
            .get(id)
            .ok_or_else(|| PushError::UnknownConnection(id.to_string()))?;
        self.disconnect(&connection, connection.generation(), DisconnectCause::ClosedByClient);
        Ok(())
    }

    /// Close every connection and shut the registry down
    pub fn shutdown(&self) {
        let connections = self.connections.snapshot();
        info!(connections = connections.len(), "Closing all connections");
        for connection in connections {
            self.disconnect(&connection, connection.generation(), DisconnectCause::ServerShutdown);
        }
        self.registry.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::CONNECTED_USERS;
    use crate::types::ConnectionState;

    fn handler() -> ConnectionHandler {
        let config = Config::default();
        ConnectionHandler::with_defaults(&config, Arc::new(BroadcastRegistry::new()))
    }

    #[test]
    fn test_default_chain_order() {
        let handler = handler();
        assert_eq!(
            handler.interceptor_names(),
            vec!["suspend-tracker", "body-limit", "broadcast-on-post"]
        );
    }

    #[tokio::test]
    async fn test_open_joins_relay_and_presence_groups() {
        let handler = handler();
        let mut sub = handler.open(None, Transport::Sse).unwrap();
        let id = sub.connection.id().clone();

        assert_eq!(sub.connection.state(), ConnectionState::Suspended);
        assert_eq!(handler.connection_count(), 1);
        let registry = handler.registry();
        assert!(registry.lookup(handler.relay_group()).unwrap().contains(&id));
        assert!(registry.lookup(CONNECTED_USERS).unwrap().contains(&id));

        let notice = sub.receiver.recv().await.unwrap();
        assert_eq!(notice.body, format!("Browser UUID: {} connected.", id));
    }

    #[tokio::test]
    async fn test_reopen_with_same_id_is_not_announced_twice() {
        let handler = handler();
        let mut observer = handler.open(None, Transport::Sse).unwrap();
        let _ = observer.receiver.recv().await;

        let first = handler.open(None, Transport::Sse).unwrap();
        let id = first.connection.id().clone();
        assert_eq!(
            observer.receiver.recv().await.unwrap().body,
            format!("Browser UUID: {} connected.", id)
        );

        let second = handler.open(Some(id.clone()), Transport::WebSocket).unwrap();
        assert!(Arc::ptr_eq(&first.connection, &second.connection));
        assert_eq!(second.generation, 1);
        assert_eq!(handler.connection_count(), 2);
        assert!(observer.receiver.try_recv().is_err());

        // The superseded channel cannot tear the session down
        handler.disconnect(&first.connection, first.generation, DisconnectCause::Cancelled);
        assert!(!second.connection.is_closed());
        assert_eq!(handler.connection_count(), 2);
    }

    #[test]
    fn test_message_restores_suspended_state() {
        let handler = handler();
        let sub = handler.open(None, Transport::WebSocket).unwrap();
        let id = sub.connection.id().clone();

        let report = handler
            .message(Some(&id), "hello".to_string(), Transport::WebSocket)
            .unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(sub.connection.state(), ConnectionState::Suspended);
    }

    #[test]
    fn test_oversize_message_is_rejected() {
        let config = Config {
            max_body_bytes: 4,
            ..Config::default()
        };
        let handler = ConnectionHandler::with_defaults(&config, Arc::new(BroadcastRegistry::new()));

        let err = handler
            .message(None, "too long".to_string(), Transport::Http)
            .unwrap_err();
        assert!(matches!(err, PushError::BodyTooLarge { size: 8, limit: 4 }));
    }

    #[test]
    fn test_message_after_shutdown_reports_error() {
        let handler = handler();
        handler.shutdown();

        let err = handler
            .message(None, "late".to_string(), Transport::Http)
            .unwrap_err();
        assert!(matches!(err, PushError::RegistryShutdown));
    }

    #[test]
    fn test_close_unknown_connection() {
        let handler = handler();
        let id = ConnectionId::generate();
        assert!(matches!(
            handler.close(&id),
            Err(PushError::UnknownConnection(_))
        ));
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let handler = handler();
        let a = handler.open(None, Transport::Sse).unwrap();
        let b = handler.open(None, Transport::WebSocket).unwrap();

        handler.shutdown();

        assert_eq!(handler.connection_count(), 0);
        for sub in [&a, &b] {
            assert_eq!(
                sub.connection.state(),
                ConnectionState::Closed(DisconnectCause::ServerShutdown)
            );
        }
        assert!(matches!(
            handler.open(None, Transport::Sse),
            Err(PushError::RegistryShutdown)
        ));
    }
}
