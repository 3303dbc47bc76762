//! Transport seam used by the bet lifecycle.

use async_trait::async_trait;

use crate::betting::types::{
    BetAdviceRequest, BetAdviceResponse, ClientTradingDecision, ClientTradingDecisionResponse,
};
use crate::error::ApiError;

/// The three venue calls a bet lifecycle needs.
#[async_trait]
pub trait BettingApi: Send + Sync {
    /// Request advice for a new bet.
    async fn advice(&self, request: &BetAdviceRequest) -> Result<BetAdviceResponse, ApiError>;

    /// Current advice for a bet id.
    async fn status(&self, bet_id: &str) -> Result<BetAdviceResponse, ApiError>;

    /// Acknowledge advice.
    async fn confirm(
        &self,
        bet_id: &str,
        decision: &ClientTradingDecision,
    ) -> Result<ClientTradingDecisionResponse, ApiError>;
}
