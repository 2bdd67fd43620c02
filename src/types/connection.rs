//! Connection identity, transport and lifecycle state

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum accepted length for a client-supplied connection id
const MAX_ID_LEN: usize = 64;

/// Unique identifier of a logical client session
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied id.
    ///
    /// Ids are limited to ASCII alphanumerics, `-` and `_` so they can be
    /// echoed into headers and log lines verbatim.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_ID_LEN {
            return None;
        }
        if raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Underlying transport carrying a connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Server-Sent Events stream opened by GET
    Sse,
    /// WebSocket upgraded from GET
    WebSocket,
    /// Plain request with no push channel (e.g. an anonymous POST)
    Http,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transport::Sse => "sse",
            Transport::WebSocket => "websocket",
            Transport::Http => "http",
        };
        f.write_str(name)
    }
}

/// Why a connection was closed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectCause {
    /// The channel vanished without a close from the client
    /// (network glitch, browser crash, failed write).
    Cancelled,
    /// The client asked to close the channel
    ClosedByClient,
    /// The server is shutting down
    ServerShutdown,
}

impl DisconnectCause {
    /// Everything except a vanished channel counts as a graceful close
    pub fn is_graceful(&self) -> bool {
        !matches!(self, DisconnectCause::Cancelled)
    }
}

/// Lifecycle state of a connection.
///
/// `Open -> Suspended` when the channel goes idle waiting for pushes,
/// `Suspended -> Open` when a new request arrives on the same session,
/// and either state moves to `Closed`, which is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "cause", rename_all = "snake_case")]
pub enum ConnectionState {
    Open,
    Suspended,
    Closed(DisconnectCause),
}

impl ConnectionState {
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed(_))
    }
}
