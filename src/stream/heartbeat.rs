//! Keep-alive handling for the odds stream.
//!
//! The venue sends `{"heartbeat": {"id": n}}` and drops the connection if the
//! same id is not echoed back promptly. Replies are produced on the message
//! handling path, never from a timer.

use tracing::debug;

use super::message::{Heartbeat, StreamMessage};
use crate::market::EventUpdate;
use crate::metrics;

/// Outcome of classifying one decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Keep-alive consumed; send this reply now.
    Reply(StreamMessage),
    /// Not a keep-alive; route the updates onward.
    Forward(Vec<EventUpdate>),
}

/// Stateless keep-alive protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartbeatProtocol;

impl HeartbeatProtocol {
    /// Create the protocol handler.
    pub fn new() -> Self {
        Self
    }

    /// Reply to a keep-alive, carrying the identical id.
    pub fn reply(&self, heartbeat: Heartbeat) -> StreamMessage {
        StreamMessage::Heartbeat(heartbeat)
    }

    /// Classify a decoded frame.
    pub fn route(&self, message: StreamMessage) -> Routed {
        match message {
            StreamMessage::Heartbeat(hb) => {
                debug!(heartbeat_id = hb.id, "Heartbeat received");
                metrics::inc_heartbeats();
                Routed::Reply(self.reply(hb))
            }
            StreamMessage::Updates(updates) => Routed::Forward(updates),
        }
    }
}
