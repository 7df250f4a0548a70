//! WebSocket live feed.
//!
//! Read-only observers (a wall display, a supervisor's laptop) connect via
//! WebSocket and receive an event for every scan, resequence and session
//! change. Observers never mutate the session.

mod manager;
mod protocol;

pub use manager::{ConnectionManager, MessageSender};
pub use protocol::*;
