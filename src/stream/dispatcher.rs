//! Decode-and-route loop for one odds stream connection.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use super::heartbeat::{HeartbeatProtocol, Routed};
use super::message::StreamMessage;
use crate::error::{DecodeError, StreamError};
use crate::market::{EventStore, EventUpdate};
use crate::metrics;

/// Why a dispatch loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer sent a close frame.
    Peer {
        /// Close code.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
    /// Closed locally.
    Local,
    /// Read side ended without a close frame.
    Ended,
    /// Transport failure.
    Failed(String),
}

/// Notification delivered to the application observer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Deltas already merged into the store, in wire order.
    Updates(Vec<EventUpdate>),
    /// Connection is gone. Sent exactly once, always last.
    Closed(CloseReason),
}

/// Counters for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Frames received.
    pub messages: u64,
    /// Heartbeats answered.
    pub heartbeats: u64,
    /// Update batches merged.
    pub update_batches: u64,
    /// Frames dropped as undecodable.
    pub decode_errors: u64,
    /// Update notifications dropped because the observer was full.
    pub observer_drops: u64,
}

enum Flow {
    Continue,
    Stop(CloseReason),
}

/// Single consumer of one connection's frames.
///
/// Frames are handled strictly in arrival order: heartbeats are answered
/// immediately on the same connection and never forwarded, update batches are
/// merged into the store and then forwarded to the observer. A full observer
/// loses the notification, never the merge.
pub struct StreamDispatcher {
    store: Arc<EventStore>,
    protocol: HeartbeatProtocol,
    observer: mpsc::Sender<StreamEvent>,
    stats: DispatchStats,
}

impl StreamDispatcher {
    /// Create a dispatcher feeding `store` and notifying `observer`.
    pub fn new(store: Arc<EventStore>, observer: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            store,
            protocol: HeartbeatProtocol::new(),
            observer,
            stats: DispatchStats::default(),
        }
    }

    /// Run until the peer closes, the read side ends, a transport failure
    /// occurs or `shutdown` flips to true. Application frames queued on
    /// `outbound` are written between inbound frames.
    ///
    /// `StreamEvent::Closed` is delivered exactly once on every exit path.
    pub async fn run<R, W>(
        mut self,
        mut read: R,
        mut write: W,
        mut outbound: mpsc::Receiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<DispatchStats, StreamError>
    where
        R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
        W: Sink<Message> + Unpin,
        W::Error: Display,
    {
        let outcome = if *shutdown.borrow_and_update() {
            Ok(CloseReason::Local)
        } else {
            loop {
                tokio::select! {
                    biased;

                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            if let Err(e) = write.send(Message::Close(None)).await {
                                debug!(error = %e, "Failed to send close frame");
                            }
                            break Ok(CloseReason::Local);
                        }
                    }

                    Some(frame) = outbound.recv() => {
                        if let Err(e) = write.send(Message::Text(frame)).await {
                            break Err(StreamError::SendFailed(e.to_string()));
                        }
                    }

                    next = read.next() => match next {
                        Some(Ok(msg)) => match self.handle_frame(msg, &mut write).await {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Stop(reason)) => break Ok(reason),
                            Err(e) => break Err(e),
                        },
                        Some(Err(e)) => break Err(StreamError::Transport(e.to_string())),
                        None => break Ok(CloseReason::Ended),
                    },
                }
            }
        };

        let reason = match &outcome {
            Ok(reason) => reason.clone(),
            Err(e) => CloseReason::Failed(e.to_string()),
        };

        info!(
            reason = ?reason,
            messages = self.stats.messages,
            heartbeats = self.stats.heartbeats,
            "Odds stream closed"
        );

        if self.observer.send(StreamEvent::Closed(reason)).await.is_err() {
            debug!("Observer gone before close notification");
        }

        outcome.map(|_| self.stats)
    }

    async fn handle_frame<W>(&mut self, msg: Message, write: &mut W) -> Result<Flow, StreamError>
    where
        W: Sink<Message> + Unpin,
        W::Error: Display,
    {
        let text = match msg {
            Message::Text(text) => text,
            Message::Binary(bytes) => {
                self.record_decode_error(DecodeError::Binary(bytes.len()));
                return Ok(Flow::Continue);
            }
            Message::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                    .unwrap_or((None, String::new()));
                warn!(code = ?code, reason = %reason, "Peer closed odds stream");
                return Ok(Flow::Stop(CloseReason::Peer { code, reason }));
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                // tungstenite answers pings on its own
                return Ok(Flow::Continue);
            }
        };

        let start = Instant::now();
        self.stats.messages += 1;
        metrics::inc_stream_messages();

        let decoded = match StreamMessage::decode(&text) {
            Ok(m) => m,
            Err(e) => {
                self.record_decode_error(e);
                return Ok(Flow::Continue);
            }
        };

        match self.protocol.route(decoded) {
            Routed::Reply(reply) => {
                let frame = reply
                    .encode()
                    .map_err(|e| StreamError::SendFailed(e.to_string()))?;
                write
                    .send(Message::Text(frame))
                    .await
                    .map_err(|e| StreamError::SendFailed(e.to_string()))?;
                self.stats.heartbeats += 1;
            }
            Routed::Forward(updates) => {
                self.store.apply_update(&updates);
                self.stats.update_batches += 1;
                debug!(deltas = updates.len(), events = self.store.len(), "Update batch merged");

                // Never wait on the observer: heartbeats queue behind this frame.
                match self.observer.try_send(StreamEvent::Updates(updates)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        self.stats.observer_drops += 1;
                        metrics::inc_observer_drops();
                        warn!(
                            dropped = self.stats.observer_drops,
                            "Observer full, update notification dropped"
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Observer gone, still maintaining store");
                    }
                }
            }
        }

        metrics::record_stream_message_latency(start);
        Ok(Flow::Continue)
    }

    fn record_decode_error(&mut self, error: DecodeError) {
        warn!(error = %error, "Dropping undecodable frame");
        self.stats.decode_errors += 1;
        metrics::inc_decode_errors();
    }
}
