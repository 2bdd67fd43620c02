//! Error types for push operations.

use thiserror::Error;

use super::ConnectionId;

/// Errors that can occur while accepting, relaying or delivering messages.
#[derive(Error, Debug)]
pub enum PushError {
    /// An environment variable could not be parsed
    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: String, reason: String },

    /// The target connection has already been closed
    #[error("Connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// The connection's outbound queue is full (slow consumer)
    #[error("Outbound queue full for connection {0}")]
    QueueFull(ConnectionId),

    /// No live connection carries this id
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// The request body is larger than the configured limit
    #[error("Message body of {size} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge { size: usize, limit: usize },

    /// The broadcast registry no longer accepts lookups
    #[error("Broadcast registry is shut down")]
    RegistryShutdown,

    /// Socket or listener failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The shutdown signal handler could not be installed
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl PushError {
    /// Short machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            PushError::Config { .. } => "CONFIG",
            PushError::ConnectionClosed(_) => "CONNECTION_CLOSED",
            PushError::QueueFull(_) => "QUEUE_FULL",
            PushError::UnknownConnection(_) => "NOT_FOUND",
            PushError::BodyTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            PushError::RegistryShutdown => "SHUTTING_DOWN",
            PushError::Io(_) | PushError::Signal(_) => "INTERNAL_ERROR",
        }
    }
}
