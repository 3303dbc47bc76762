//! Frames exchanged on the odds stream.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::market::EventUpdate;

/// Keep-alive correlation record. The id must be echoed back verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Correlation id.
    pub id: i32,
}

/// A decoded stream frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Keep-alive frame.
    Heartbeat(Heartbeat),
    /// Batch of event deltas.
    Updates(Vec<EventUpdate>),
}

/// Frame as it appears on the wire: both members optional.
#[derive(Debug, Deserialize, Serialize, Default)]
struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heartbeat: Option<WireHeartbeat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updates: Option<Vec<EventUpdate>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireHeartbeat {
    #[serde(default)]
    id: Option<i32>,
}

impl StreamMessage {
    /// Decode a text frame.
    ///
    /// A heartbeat member wins over updates. A heartbeat without an id is a
    /// decode error rather than a frame to drop.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let wire: WireMessage = serde_json::from_str(text)?;

        match (wire.heartbeat, wire.updates) {
            (Some(hb), _) => hb
                .id
                .map(|id| StreamMessage::Heartbeat(Heartbeat { id }))
                .ok_or(DecodeError::MissingHeartbeatId),
            (None, Some(updates)) => Ok(StreamMessage::Updates(updates)),
            (None, None) => Err(DecodeError::Unrecognized),
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let wire = match self {
            StreamMessage::Heartbeat(hb) => WireMessage {
                heartbeat: Some(WireHeartbeat { id: Some(hb.id) }),
                updates: None,
            },
            StreamMessage::Updates(updates) => WireMessage {
                heartbeat: None,
                updates: Some(updates.clone()),
            },
        };
        serde_json::to_string(&wire)
    }

    /// Check if this is a keep-alive frame.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, StreamMessage::Heartbeat(_))
    }
}
