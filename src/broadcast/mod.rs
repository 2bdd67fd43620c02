//! Broadcast groups and the echo relay
//!
//! ## Design
//! - [`BroadcastRegistry`] is created once by the server and injected into
//!   the handler, listeners and relay; there is no global instance.
//! - Membership is guarded per group. Broadcasting snapshots the members and
//!   queues without holding the lock, so a join or leave during a broadcast
//!   may or may not see that message.

mod group;
mod registry;
pub mod relay;

pub use group::BroadcastGroup;
pub use registry::{BroadcastRegistry, GroupStats};
pub use relay::EchoRelay;
