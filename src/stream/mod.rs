//! Odds stream module.
//!
//! This module handles:
//! - Frame types and decoding
//! - The heartbeat keep-alive protocol
//! - The decode-and-route loop feeding the event store
//! - The websocket connection itself

pub mod connection;
pub mod dispatcher;
pub mod heartbeat;
pub mod message;

pub use connection::{odds_url, open_stream, StreamHandle};
pub use dispatcher::{CloseReason, DispatchStats, StreamDispatcher, StreamEvent};
pub use heartbeat::{HeartbeatProtocol, Routed};
pub use message::{Heartbeat, StreamMessage};
