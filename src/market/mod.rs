//! Market data module for the odds stream.
//!
//! This module handles:
//! - Event, price and live-state types
//! - The event store that merges incremental updates into snapshots

pub mod store;
pub mod types;

pub use store::EventStore;
pub use types::{EventDescription, EventId, EventUpdate, GameTime, LiveData, Odds, Period, Quote};
