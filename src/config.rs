//! Server configuration from environment variables

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::interceptor::DEFAULT_MAX_BODY;
use crate::listener::CONNECTED_USERS;
use crate::types::{PushError, PushResult};

/// Default endpoint path for the managed echo resource
pub const DEFAULT_PATH: &str = "/GwtRpcDemo/atmosphere/rpc";

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Path serving GET (channel), POST (message) and DELETE (close)
    pub path: String,
    /// Group that POSTed messages are echoed to
    pub relay_group: String,
    /// Group new connections are announced to
    pub presence_group: String,
    /// Per-connection outbound queue size
    pub queue_capacity: usize,
    /// Largest accepted message body in bytes
    pub max_body_bytes: usize,
    /// Upper bound on a single WebSocket write
    pub write_timeout: Duration,
    /// Interval between SSE keep-alive comments
    pub keep_alive: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            path: DEFAULT_PATH.to_string(),
            relay_group: DEFAULT_PATH.to_string(),
            presence_group: CONNECTED_USERS.to_string(),
            queue_capacity: 256,
            max_body_bytes: DEFAULT_MAX_BODY,
            write_timeout: Duration::from_secs(10),
            keep_alive: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Build a config from `PUSH_ECHO_*` variables, falling back to defaults.
    ///
    /// The relay group defaults to the endpoint path.
    pub fn from_env() -> PushResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> PushResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let path = match lookup("PUSH_ECHO_PATH") {
            Some(path) => normalize_path(&path)?,
            None => defaults.path,
        };
        let relay_group = lookup("PUSH_ECHO_RELAY_GROUP").unwrap_or_else(|| path.clone());

        Ok(Self {
            bind_addr: parse_or(&lookup, "PUSH_ECHO_ADDR", defaults.bind_addr)?,
            relay_group,
            path,
            presence_group: lookup("PUSH_ECHO_PRESENCE_GROUP").unwrap_or(defaults.presence_group),
            queue_capacity: parse_or(&lookup, "PUSH_ECHO_QUEUE_CAPACITY", defaults.queue_capacity)?
                .max(1),
            max_body_bytes: parse_or(&lookup, "PUSH_ECHO_MAX_BODY", defaults.max_body_bytes)?,
            write_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PUSH_ECHO_WRITE_TIMEOUT_SECS",
                defaults.write_timeout.as_secs(),
            )?),
            keep_alive: Duration::from_secs(parse_or(
                &lookup,
                "PUSH_ECHO_KEEPALIVE_SECS",
                defaults.keep_alive.as_secs(),
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> PushResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| PushError::Config {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn normalize_path(raw: &str) -> PushResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(PushError::Config {
            key: "PUSH_ECHO_PATH".to_string(),
            reason: format!("'{}' must be an absolute path other than '/'", raw),
        });
    }
    Ok(trimmed.to_string())
}
