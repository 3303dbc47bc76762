//! Scripted venue client for unit testing.
//!
//! Responses are queued per endpoint and consumed in order; every call is
//! recorded so tests can assert on what the lifecycle actually sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::BettingApi;
use crate::betting::types::{
    BetAdviceRequest, BetAdviceResponse, ClientTradingDecision, ClientTradingDecisionResponse,
};
use crate::error::ApiError;

/// One recorded confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedConfirmation {
    /// Bet id in the path.
    pub bet_id: String,
    /// Body sent.
    pub decision: ClientTradingDecision,
}

#[derive(Debug, Default)]
struct MockState {
    advice: VecDeque<Result<BetAdviceResponse, ApiError>>,
    status: VecDeque<Result<BetAdviceResponse, ApiError>>,
    confirmation_failures: VecDeque<ApiError>,
    advice_requests: Vec<BetAdviceRequest>,
    status_calls: Vec<String>,
    confirmations: Vec<RecordedConfirmation>,
}

/// Mock venue client for testing.
#[derive(Debug, Clone, Default)]
pub struct MockStsClient {
    state: Arc<Mutex<MockState>>,
    /// Simulated latency per call.
    latency: Duration,
}

impl MockStsClient {
    /// Create a mock with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Queue the next advice response.
    pub fn push_advice(&self, response: BetAdviceResponse) -> &Self {
        self.state().advice.push_back(Ok(response));
        self
    }

    /// Queue an advice failure.
    pub fn push_advice_error(&self, error: ApiError) -> &Self {
        self.state().advice.push_back(Err(error));
        self
    }

    /// Queue the next status response.
    pub fn push_status(&self, response: BetAdviceResponse) -> &Self {
        self.state().status.push_back(Ok(response));
        self
    }

    /// Queue a status failure.
    pub fn push_status_error(&self, error: ApiError) -> &Self {
        self.state().status.push_back(Err(error));
        self
    }

    /// Fail the next confirmation with `error`. Confirmations succeed otherwise.
    pub fn fail_next_confirmation(&self, error: ApiError) -> &Self {
        self.state().confirmation_failures.push_back(error);
        self
    }

    /// Advice requests received so far.
    pub fn advice_requests(&self) -> Vec<BetAdviceRequest> {
        self.state().advice_requests.clone()
    }

    /// Bet ids polled so far.
    pub fn status_calls(&self) -> Vec<String> {
        self.state().status_calls.clone()
    }

    /// Confirmations received so far, including failed ones.
    pub fn confirmations(&self) -> Vec<RecordedConfirmation> {
        self.state().confirmations.clone()
    }
}

#[async_trait]
impl BettingApi for MockStsClient {
    async fn advice(&self, request: &BetAdviceRequest) -> Result<BetAdviceResponse, ApiError> {
        self.simulate_latency().await;

        let mut state = self.state();
        state.advice_requests.push(request.clone());
        state
            .advice
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted advice".to_string())))
    }

    async fn status(&self, bet_id: &str) -> Result<BetAdviceResponse, ApiError> {
        self.simulate_latency().await;

        let mut state = self.state();
        state.status_calls.push(bet_id.to_string());
        state
            .status
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted status".to_string())))
    }

    async fn confirm(
        &self,
        bet_id: &str,
        decision: &ClientTradingDecision,
    ) -> Result<ClientTradingDecisionResponse, ApiError> {
        self.simulate_latency().await;

        let mut state = self.state();
        state.confirmations.push(RecordedConfirmation {
            bet_id: bet_id.to_string(),
            decision: decision.clone(),
        });
        match state.confirmation_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(ClientTradingDecisionResponse::default()),
        }
    }
}
