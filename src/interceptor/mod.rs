//! Interceptor chain run around every request
//!
//! The chain is an ordered list fixed at startup. For each request,
//! `inspect` runs front to back and may reject the request; after the
//! resource has handled it, `post_inspect` runs back to front.

mod body_limit;
mod broadcast_on_post;
mod suspend_tracker;

pub use body_limit::{BodyLimit, DEFAULT_MAX_BODY};
pub use broadcast_on_post::BroadcastOnPost;
pub use suspend_tracker::SuspendTracker;

use std::sync::Arc;

use tracing::debug;

use crate::connection::Connection;
use crate::types::{ConnectionId, DeliveryReport, PushError, Transport};

/// Kind of request flowing through the chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// A channel is being opened or re-attached
    Open,
    /// A client message
    Message,
}

/// Request context handed to each interceptor
#[derive(Debug)]
pub struct PushRequest {
    pub kind: RequestKind,
    pub connection: Option<Arc<Connection>>,
    pub transport: Transport,
    pub body: Option<String>,
    /// Set when the session has already been announced
    pub resumed: bool,
    /// Filled in by whichever interceptor relays the message
    pub relayed: Option<DeliveryReport>,
    /// Set when the relay itself failed, e.g. during shutdown
    pub relay_error: Option<PushError>,
}

impl PushRequest {
    pub fn open(connection: Arc<Connection>, transport: Transport) -> Self {
        Self {
            kind: RequestKind::Open,
            connection: Some(connection),
            transport,
            body: None,
            resumed: false,
            relayed: None,
            relay_error: None,
        }
    }

    pub fn message(
        connection: Option<Arc<Connection>>,
        transport: Transport,
        body: String,
    ) -> Self {
        Self {
            kind: RequestKind::Message,
            connection,
            transport,
            body: Some(body),
            resumed: false,
            relayed: None,
            relay_error: None,
        }
    }
}

/// Outcome of `Interceptor::inspect`
#[derive(Debug)]
pub enum Action {
    Continue,
    Reject(PushError),
}

/// One stage of the chain
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn inspect(&self, _request: &mut PushRequest) -> Action {
        Action::Continue
    }

    fn post_inspect(&self, _request: &mut PushRequest) {}

    /// The connection is gone; drop any per-connection state
    fn on_disconnect(&self, _id: &ConnectionId) {}
}

/// Ordered list of interceptors
#[derive(Default, Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor to the end of the chain
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) -> &mut Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Names in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run `inspect` front to back, stopping at the first rejection
    pub fn inspect(&self, request: &mut PushRequest) -> Result<(), PushError> {
        for interceptor in &self.interceptors {
            if let Action::Reject(e) = interceptor.inspect(request) {
                debug!(interceptor = interceptor.name(), error = %e, "Request rejected");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Run `post_inspect` back to front
    pub fn post_inspect(&self, request: &mut PushRequest) {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.post_inspect(request);
        }
    }

    pub fn on_disconnect(&self, id: &ConnectionId) {
        for interceptor in &self.interceptors {
            interceptor.on_disconnect(id);
        }
    }
}
