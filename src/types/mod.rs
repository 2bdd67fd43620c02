//! Data types for the push-echo server
//!
//! This module contains the core data structures shared by the registry,
//! the connection handler and the HTTP surface.

mod connection;
mod error;
mod message;

pub use connection::{ConnectionId, ConnectionState, DisconnectCause, Transport};
pub use error::PushError;
pub use message::{DeliveryFailure, DeliveryReport, PushMessage};

/// Result type for push operations
pub type PushResult<T> = Result<T, PushError>;
