//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::betting::BetState;
use crate::market::EventStore;

/// Session counters kept by the application shell.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// Update batches observed.
    pub update_messages: u64,
    /// Bets started.
    pub bets_placed: u64,
    /// Bets accepted.
    pub bets_accepted: u64,
    /// Bets rejected.
    pub bets_rejected: u64,
    /// Bets closed with any other final status.
    pub bets_other: u64,
    /// Bets whose lifecycle failed.
    pub bets_failed: u64,
    /// Most recent bet id.
    pub last_bet_id: Option<String>,
}

impl SessionStats {
    /// Count a finished lifecycle.
    pub fn record_outcome(&mut self, state: Option<BetState>) {
        match state {
            Some(BetState::Accepted) => self.bets_accepted += 1,
            Some(BetState::Rejected) => self.bets_rejected += 1,
            Some(BetState::Other) => self.bets_other += 1,
            _ => self.bets_failed += 1,
        }
    }
}

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Whether the odds stream is open.
    pub ready: Arc<AtomicBool>,
    /// Cached event data.
    pub store: Arc<EventStore>,
    /// Session counters.
    pub stats: Arc<RwLock<SessionStats>>,
}

impl AppState {
    /// Create state over `store`, not ready.
    pub fn new(store: Arc<EventStore>) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            store,
            stats: Arc::new(RwLock::new(SessionStats::default())),
        }
    }

    /// Share an existing readiness flag, such as a stream's connected flag.
    pub fn with_ready_flag(mut self, ready: Arc<AtomicBool>) -> Self {
        self.ready = ready;
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the stream is open.
    pub ready: bool,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// "streaming" or "disconnected".
    pub status: &'static str,
    /// Events cached.
    pub events: usize,
    /// Cached events currently in play.
    pub inplay_events: usize,
    /// Session counters.
    pub stats: SessionStats,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 while the stream is open, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse { ready: is_ready };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns cache size and session statistics.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.stats.read().await.clone();
    let status = if state.is_ready() { "streaming" } else { "disconnected" };

    Json(StatusResponse {
        status,
        events: state.store.len(),
        inplay_events: state.store.inplay_count(),
        stats,
    })
}
