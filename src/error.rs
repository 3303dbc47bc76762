//! Unified error types for the STS client.

use thiserror::Error;

use crate::betting::types::AdviceStatus;
use crate::betting::BetState;
use crate::client::types::ErrorResponse;

/// Unified error type for the STS client.
#[derive(Error, Debug)]
pub enum StsError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration validation error.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// REST call error.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Streaming connection error.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// Bet lifecycle error.
    #[error("bet error: {0}")]
    Bet(#[from] BetError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single request against the venue's REST API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection-level failure or timeout. Never retried by the client.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Well-formed response with a non-success status code.
    #[error("application error {code}: {body}")]
    Application {
        /// HTTP status code.
        code: u16,
        /// Structured error body from the venue.
        body: ErrorResponse,
    },

    /// Success response whose body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Check if this is a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Status code of an application error.
    pub fn code(&self) -> Option<u16> {
        match self {
            ApiError::Application { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// A stream frame that could not be classified.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Heartbeat frame without its correlation id.
    #[error("heartbeat frame is missing its id")]
    MissingHeartbeatId,

    /// Frame carries neither a heartbeat nor updates.
    #[error("frame is neither a heartbeat nor an update batch")]
    Unrecognized,

    /// Frame is not valid JSON for any known shape.
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-text frame where text was expected.
    #[error("unexpected binary frame of {0} bytes")]
    Binary(usize),
}

/// Streaming connection errors.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Connection failed.
    #[error("stream connection failed: {0}")]
    ConnectionFailed(String),

    /// Send failed.
    #[error("failed to send stream frame: {0}")]
    SendFailed(String),

    /// Read side failed.
    #[error("stream transport failure: {0}")]
    Transport(String),

    /// Stream task is gone.
    #[error("stream already closed")]
    Closed,
}

/// Bet lifecycle errors. Each variant names the bet so a partially
/// completed lifecycle can be reconciled by the caller.
#[derive(Error, Debug)]
pub enum BetError {
    /// The advice request failed; nothing was confirmed.
    #[error("advice for bet {bet_id} failed: {source}")]
    Advice {
        /// Bet id.
        bet_id: String,
        /// Underlying failure.
        #[source]
        source: ApiError,
    },

    /// A confirmation failed after advice was received.
    #[error("confirmation #{attempt} of {status} for bet {bet_id} failed: {source}")]
    Confirmation {
        /// Bet id.
        bet_id: String,
        /// Status being confirmed.
        status: AdviceStatus,
        /// Which confirmation (1 or 2).
        attempt: u32,
        /// Underlying failure.
        #[source]
        source: ApiError,
    },

    /// A status poll failed while the bet was pending.
    #[error("status poll {polls} for bet {bet_id} failed: {source}")]
    Status {
        /// Bet id.
        bet_id: String,
        /// Poll number that failed.
        polls: u32,
        /// Underlying failure.
        #[source]
        source: ApiError,
    },

    /// The pending wait was cancelled.
    #[error("pending wait for bet {bet_id} cancelled after {polls} polls")]
    Cancelled {
        /// Bet id.
        bet_id: String,
        /// Polls completed before cancellation.
        polls: u32,
    },

    /// The venue reported a status the state machine cannot move to.
    #[error("invalid bet transition {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: BetState,
        /// Reported status.
        to: AdviceStatus,
    },
}

impl BetError {
    /// Bet id this error belongs to, if any.
    pub fn bet_id(&self) -> Option<&str> {
        match self {
            BetError::Advice { bet_id, .. }
            | BetError::Confirmation { bet_id, .. }
            | BetError::Status { bet_id, .. }
            | BetError::Cancelled { bet_id, .. } => Some(bet_id),
            BetError::InvalidTransition { .. } => None,
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, StsError>;
