//! Client runtime for a sports-betting venue.
//!
//! The venue pushes live odds over a websocket and takes bets over REST. This
//! library keeps a local copy of every event the stream has mentioned and
//! drives bets through the venue's advice/confirmation protocol.
//!
//! # Flow
//!
//! ```text
//! auth ──> token ──> odds?token=..  ──> StreamDispatcher ──> EventStore
//!                                          │   ▲
//!                                heartbeat │   │ echo
//!                                          ▼   │
//!                                      HeartbeatProtocol
//!
//! BetTerms ──> advice ──> confirm ──(PENDING)──> poll status ──> confirm
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Event types and the merging event store
//! - [`stream`]: Odds stream decoding, heartbeats and the connection loop
//! - [`client`]: REST transport and a scripted mock
//! - [`betting`]: Bet types and the advice/confirmation lifecycle
//! - [`api`]: HTTP API for health and status
//! - [`metrics`]: Prometheus counters and latency histograms
//! - [`utils`]: Utility functions

pub mod api;
pub mod betting;
pub mod client;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod stream;
pub mod utils;

pub use config::Config;
pub use error::{Result, StsError};
