//! Bet advice, confirmation and pending-status polling.

use std::time::Duration;

use strum::Display;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, instrument, warn, Span};
use uuid::Uuid;

use super::types::{AdviceStatus, BetAdviceResponse, BetTerms, ClientTradingDecision};
use crate::client::BettingApi;
use crate::error::BetError;
use crate::metrics;

/// Default wait between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Where a bet is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BetState {
    /// Advice requested, no answer yet.
    Requested,
    /// Venue answered PENDING; polling.
    Pending,
    /// Venue accepted.
    Accepted,
    /// Venue rejected.
    Rejected,
    /// Venue reported some other final status.
    Other,
}

impl BetState {
    /// Check if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BetState::Accepted | BetState::Rejected | BetState::Other)
    }

    /// Move to the state implied by a venue status.
    pub fn transition(self, status: &AdviceStatus) -> Result<BetState, BetError> {
        if self.is_terminal() {
            return Err(BetError::InvalidTransition {
                from: self,
                to: status.clone(),
            });
        }

        Ok(match status {
            AdviceStatus::Pending => BetState::Pending,
            AdviceStatus::Accepted => BetState::Accepted,
            AdviceStatus::Rejected => BetState::Rejected,
            AdviceStatus::Other(_) => BetState::Other,
        })
    }
}

/// One bet as tracked by the controller.
#[derive(Debug, Clone)]
pub struct BetRecord {
    /// Client-generated id, used for every call about this bet.
    pub bet_id: String,
    /// Terms the advice was requested with.
    pub terms: BetTerms,
    /// Current state.
    pub state: BetState,
    /// Status polls issued.
    pub polls: u32,
    /// Confirmations sent.
    pub confirmations: u32,
}

impl BetRecord {
    fn new(bet_id: String, terms: BetTerms) -> Self {
        Self {
            bet_id,
            terms,
            state: BetState::Requested,
            polls: 0,
            confirmations: 0,
        }
    }

    fn advance(&mut self, status: &AdviceStatus) -> Result<(), BetError> {
        self.state = self.state.transition(status)?;
        Ok(())
    }
}

/// Result of a completed lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct BetOutcome {
    /// Bet id.
    pub bet_id: String,
    /// Final state, always terminal.
    pub state: BetState,
    /// Last response from the venue.
    pub advice: BetAdviceResponse,
    /// Status polls issued.
    pub polls: u32,
    /// Confirmations sent.
    pub confirmations: u32,
}

/// Drives one bet from advice to a terminal status.
///
/// The venue's advice is always followed: whatever status, price and stake
/// it returns are echoed back in the confirmation. A PENDING advice is
/// confirmed once, polled until it resolves, then confirmed again.
pub struct BetLifecycleController<'a, A: BettingApi + ?Sized> {
    api: &'a A,
    poll_interval: Duration,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, A: BettingApi + ?Sized> BetLifecycleController<'a, A> {
    /// Create a controller polling once per second.
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: None,
        }
    }

    /// Set the wait between status polls.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Abort the pending wait once `cancel` reads true.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Request advice for `terms`, follow it and wait out any pending period.
    ///
    /// Returns only after a terminal status has been confirmed. A failure at
    /// any step stops the lifecycle at that step; nothing is retried.
    #[instrument(skip(self, terms), fields(event_id = terms.event_id, bet_id = tracing::field::Empty))]
    pub async fn place(&self, terms: BetTerms) -> Result<BetOutcome, BetError> {
        let bet_id = Uuid::new_v4().to_string();
        Span::current().record("bet_id", bet_id.as_str());

        let request = terms.to_request(&bet_id, OffsetDateTime::now_utc());
        let mut record = BetRecord::new(bet_id, terms);

        metrics::inc_advice_requests();
        let advice = self
            .api
            .advice(&request)
            .await
            .map_err(|source| BetError::Advice {
                bet_id: record.bet_id.clone(),
                source,
            })?;
        record.advance(&advice.status)?;

        info!(
            status = %advice.status,
            price = ?advice.price,
            stake = ?advice.stake,
            "Advice received"
        );

        self.confirm(&mut record, &advice).await?;

        let last = if advice.status == AdviceStatus::Pending {
            let resolved = self.wait_while_pending(&mut record).await?;
            self.confirm(&mut record, &resolved).await?;
            resolved
        } else {
            advice
        };

        metrics::inc_bets_resolved(&last.status.to_string());
        info!(
            state = %record.state,
            polls = record.polls,
            confirmations = record.confirmations,
            "Bet resolved"
        );

        Ok(BetOutcome {
            bet_id: record.bet_id,
            state: record.state,
            advice: last,
            polls: record.polls,
            confirmations: record.confirmations,
        })
    }

    async fn confirm(
        &self,
        record: &mut BetRecord,
        advice: &BetAdviceResponse,
    ) -> Result<(), BetError> {
        let decision = ClientTradingDecision::follow(advice, record.terms.attribution.currency);
        record.confirmations += 1;
        metrics::inc_confirmations();

        self.api
            .confirm(&record.bet_id, &decision)
            .await
            .map_err(|source| BetError::Confirmation {
                bet_id: record.bet_id.clone(),
                status: advice.status.clone(),
                attempt: record.confirmations,
                source,
            })?;

        debug!(status = %decision.status, attempt = record.confirmations, "Confirmation sent");
        Ok(())
    }

    async fn wait_while_pending(
        &self,
        record: &mut BetRecord,
    ) -> Result<BetAdviceResponse, BetError> {
        let mut cancel = self.cancel.clone();

        loop {
            if self.pause(&mut cancel).await {
                warn!(polls = record.polls, "Pending wait cancelled");
                return Err(BetError::Cancelled {
                    bet_id: record.bet_id.clone(),
                    polls: record.polls,
                });
            }

            record.polls += 1;
            metrics::inc_status_polls();

            let status = self
                .api
                .status(&record.bet_id)
                .await
                .map_err(|source| BetError::Status {
                    bet_id: record.bet_id.clone(),
                    polls: record.polls,
                    source,
                })?;
            record.advance(&status.status)?;

            if status.status.is_terminal() {
                return Ok(status);
            }
            debug!(polls = record.polls, "Bet still pending");
        }
    }

    /// Wait one poll interval. Returns true if cancelled first.
    async fn pause(&self, cancel: &mut Option<watch::Receiver<bool>>) -> bool {
        let Some(rx) = cancel else {
            sleep(self.poll_interval).await;
            return false;
        };

        if *rx.borrow_and_update() {
            return true;
        }

        let deadline = Instant::now() + self.poll_interval;
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => return false,
                changed = rx.changed() => match changed {
                    Ok(()) => {
                        if *rx.borrow_and_update() {
                            return true;
                        }
                    }
                    Err(_) => {
                        // Sender dropped, nothing can cancel this wait.
                        sleep_until(deadline).await;
                        return false;
                    }
                },
            }
        }
    }
}
