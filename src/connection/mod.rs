//! Live client connections
//!
//! A [`Connection`] is one logical client session. It owns the sending half
//! of a bounded queue; whichever transport task holds the receiving half
//! (an SSE stream or a WebSocket loop) writes queued messages to the wire.
//!
//! A session may re-attach a new transport channel while it is still live
//! (a client re-issuing GET with its id). Each attachment bumps the
//! connection's generation so the superseded channel cannot tear down the
//! session when it goes away.

mod table;

pub use table::ConnectionTable;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::types::{
    ConnectionId, ConnectionState, DisconnectCause, PushError, PushMessage, PushResult, Transport,
};

/// Receiving half of a connection's outbound queue, tagged with the
/// generation it belongs to.
pub struct Subscription {
    pub connection: Arc<Connection>,
    pub generation: u64,
    pub receiver: mpsc::Receiver<PushMessage>,
}

/// One client's long-lived logical channel
pub struct Connection {
    id: ConnectionId,
    transport: Mutex<Transport>,
    state: Mutex<ConnectionState>,
    outbound: Mutex<Option<mpsc::Sender<PushMessage>>>,
    generation: AtomicU64,
    event_counter: AtomicU64,
    capacity: usize,
    connected_at: i64,
}

impl Connection {
    /// Create an open connection with a fresh outbound queue
    pub fn open(id: ConnectionId, transport: Transport, capacity: usize) -> Subscription {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let connection = Arc::new(Self {
            id,
            transport: Mutex::new(transport),
            state: Mutex::new(ConnectionState::Open),
            outbound: Mutex::new(Some(tx)),
            generation: AtomicU64::new(0),
            event_counter: AtomicU64::new(0),
            capacity,
            connected_at: chrono::Utc::now().timestamp(),
        });
        Subscription {
            connection,
            generation: 0,
            receiver: rx,
        }
    }

    /// Attach a new transport channel to this session.
    ///
    /// The previous queue is dropped, which ends the old channel's stream.
    /// Returns `None` if the connection is already closed.
    pub fn reattach(self: &Arc<Self>, transport: Transport) -> Option<Subscription> {
        let mut state = self.state.lock();
        if state.is_closed() {
            return None;
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        *self.outbound.lock() = Some(tx);
        *self.transport.lock() = transport;
        *state = ConnectionState::Open;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        Some(Subscription {
            connection: Arc::clone(self),
            generation,
            receiver: rx,
        })
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn transport(&self) -> Transport {
        *self.transport.lock()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn connected_at(&self) -> i64 {
        self.connected_at
    }

    /// Generation of the currently attached transport channel
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether `generation` is still the attached transport channel
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    /// Next id for an event written to this session's channel.
    ///
    /// Messages arrive from several groups, each with its own sequence, so
    /// the event id is numbered per session and keeps counting across
    /// re-attached channels.
    pub fn next_event_id(&self) -> u64 {
        self.event_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Open -> Suspended. Returns false if the connection was not open.
    pub fn suspend(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ConnectionState::Open {
            *state = ConnectionState::Suspended;
            true
        } else {
            false
        }
    }

    /// Suspended -> Open. Returns false if the connection was not suspended.
    pub fn resume(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ConnectionState::Suspended {
            *state = ConnectionState::Open;
            true
        } else {
            false
        }
    }

    /// Move to the terminal state and drop the outbound queue.
    ///
    /// Returns false if the connection was already closed.
    pub fn close(&self, cause: DisconnectCause) -> bool {
        let mut state = self.state.lock();
        if state.is_closed() {
            return false;
        }
        *state = ConnectionState::Closed(cause);
        self.outbound.lock().take();
        true
    }

    /// Close only if `generation` is still the attached channel. The check
    /// and the close happen under the state lock that `reattach` holds while
    /// bumping the generation.
    pub fn close_if_current(&self, generation: u64, cause: DisconnectCause) -> bool {
        let mut state = self.state.lock();
        if state.is_closed() || !self.is_current(generation) {
            return false;
        }
        *state = ConnectionState::Closed(cause);
        self.outbound.lock().take();
        true
    }

    /// Queue a message for this connection without waiting.
    pub fn deliver(&self, message: PushMessage) -> PushResult<()> {
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return Err(PushError::ConnectionClosed(self.id.clone()));
        };

        tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => PushError::QueueFull(self.id.clone()),
            TrySendError::Closed(_) => PushError::ConnectionClosed(self.id.clone()),
        })
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("transport", &self.transport())
            .field("state", &self.state())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}
