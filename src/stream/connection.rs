//! Websocket connection to the odds stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tracing::{info, instrument};
use url::Url;
use uuid::Uuid;

use super::dispatcher::{DispatchStats, StreamDispatcher, StreamEvent};
use super::message::StreamMessage;
use crate::error::StreamError;
use crate::market::EventStore;

/// Capacity of the observer and outbound channels.
const CHANNEL_CAPACITY: usize = 1000;

/// Build the odds stream URL for a session token.
pub fn odds_url(stream_base: &Url, token: Uuid) -> Result<Url, url::ParseError> {
    let mut url = stream_base.join("odds")?;
    url.query_pairs_mut()
        .append_pair("token", &token.to_string());
    Ok(url)
}

/// Handle to a running odds stream.
///
/// The receive loop runs on its own task; this handle is the only way to
/// write to the connection, observe it and close it.
pub struct StreamHandle {
    store: Arc<EventStore>,
    events: mpsc::Receiver<StreamEvent>,
    outbound: mpsc::Sender<String>,
    shutdown: watch::Sender<bool>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<Result<DispatchStats, StreamError>>,
}

impl StreamHandle {
    /// Store fed by this connection.
    pub fn store(&self) -> Arc<EventStore> {
        self.store.clone()
    }

    /// Next observer notification. `None` once the loop has finished and
    /// every notification has been read.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Queue an application frame on the connection.
    pub async fn send(&self, message: &StreamMessage) -> Result<(), StreamError> {
        let frame = message
            .encode()
            .map_err(|e| StreamError::SendFailed(e.to_string()))?;
        self.outbound
            .send(frame)
            .await
            .map_err(|_| StreamError::Closed)
    }

    /// Check if the receive loop is still running.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Shared connection flag, for health reporting.
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        self.connected.clone()
    }

    /// Ask the receive loop to close the connection.
    pub fn close(&self) {
        // Err only when the loop has already exited.
        let _ = self.shutdown.send(true);
    }

    /// Close and wait for the receive loop to finish.
    pub async fn shutdown(self) -> Result<DispatchStats, StreamError> {
        self.close();
        self.join().await
    }

    /// Wait for the receive loop to finish on its own.
    pub async fn join(self) -> Result<DispatchStats, StreamError> {
        self.task
            .await
            .map_err(|e| StreamError::Transport(format!("stream task failed: {}", e)))?
    }
}

/// Connect to `url` and start the receive loop on a background task.
#[instrument(skip(store), fields(url = %redact(url)))]
pub async fn open_stream(url: &Url, store: Arc<EventStore>) -> Result<StreamHandle, StreamError> {
    info!("Connecting to odds stream");

    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;

    let (write, read) = ws_stream.split();

    let (events_tx, events) = mpsc::channel(CHANNEL_CAPACITY);
    let (outbound, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (shutdown, shutdown_rx) = watch::channel(false);
    let connected = Arc::new(AtomicBool::new(true));

    let dispatcher = StreamDispatcher::new(store.clone(), events_tx);
    let flag = connected.clone();
    let task = tokio::spawn(async move {
        let result = dispatcher.run(read, write, outbound_rx, shutdown_rx).await;
        flag.store(false, Ordering::SeqCst);
        result
    });

    info!("Odds stream connected");

    Ok(StreamHandle {
        store,
        events,
        outbound,
        shutdown,
        connected,
        task,
    })
}

/// URL without its query, so tokens stay out of logs.
fn redact(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odds_url_appends_endpoint_and_token() {
        let base = Url::parse("ws://venue.example/longshot/STS/2.0.0/").unwrap();
        let token = Uuid::nil();
        let url = odds_url(&base, token).unwrap();

        assert_eq!(
            url.as_str(),
            "ws://venue.example/longshot/STS/2.0.0/odds?token=00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn redact_drops_token() {
        let url = Url::parse("wss://venue.example/odds?token=secret").unwrap();
        assert_eq!(redact(&url), "wss://venue.example/odds");
    }
}
