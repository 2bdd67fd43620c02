//! Shared application state

use std::sync::Arc;

use crate::broadcast::BroadcastRegistry;
use crate::config::Config;
use crate::handler::ConnectionHandler;

/// State shared by every request
pub struct AppState {
    pub handler: Arc<ConnectionHandler>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(handler: Arc<ConnectionHandler>, config: Arc<Config>) -> Self {
        Self { handler, config }
    }

    /// Build the default echo handler over a fresh registry
    pub fn from_config(config: Config) -> Self {
        let registry = Arc::new(BroadcastRegistry::new());
        let handler = Arc::new(ConnectionHandler::with_defaults(&config, registry));
        Self::new(handler, Arc::new(config))
    }

    pub fn registry(&self) -> &Arc<BroadcastRegistry> {
        self.handler.registry()
    }
}
