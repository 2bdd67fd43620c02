//! push-echo
//!
//! A minimal push-messaging server: clients open a long-lived channel with a
//! GET on a fixed path and every message they POST is echoed to all
//! connected clients through named broadcast groups.
//!
//! # Features
//!
//! - **Broadcast groups**: lazily created, name-keyed, safe under concurrent use
//! - **Best-effort relay**: one slow or dead client never blocks the others
//! - **Transports**: Server-Sent Events, or WebSocket on upgrade
//! - **Interceptor chain**: explicit, ordered, configured at startup
//! - **Lifecycle listeners**: connect, resume, disconnect and message callbacks
//!
//! # Modules
//!
//! - `types`: Ids, states, messages, errors
//! - `connection`: Live connections and their outbound queues
//! - `broadcast`: Broadcast registry, groups and the echo relay
//! - `interceptor`: Interceptor trait and the built-in interceptors
//! - `listener`: Lifecycle listener trait and the presence listener
//! - `handler`: Connection lifecycle driver
//! - `api`: Axum router, SSE and WebSocket transports
//! - `config`: Environment-based configuration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use push_echo::{create_router, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let addr = config.bind_addr;
//!     let app = create_router(Arc::new(AppState::from_config(config)));
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod broadcast;
pub mod config;
pub mod connection;
pub mod handler;
pub mod interceptor;
pub mod listener;
pub mod types;

// Re-export commonly used items at crate root
pub use api::{create_router, AppState};
pub use broadcast::{BroadcastGroup, BroadcastRegistry, EchoRelay};
pub use config::Config;
pub use connection::{Connection, Subscription};
pub use handler::ConnectionHandler;
pub use interceptor::{Interceptor, InterceptorChain};
pub use listener::{ConnectedUsers, ResourceListener};
pub use types::{
    ConnectionId, ConnectionState, DeliveryReport, DisconnectCause, PushError, PushMessage,
    PushResult, Transport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
