//! Bet placement: advice, confirmation and pending-status handling.

pub mod lifecycle;
pub mod types;

pub use lifecycle::{BetLifecycleController, BetOutcome, BetRecord, BetState, DEFAULT_POLL_INTERVAL};
pub use types::{
    AdviceStatus, Attribution, BetAdviceRequest, BetAdviceResponse, BetSettlement,
    BetSettlementResponse, BetTerms, ClientTradingDecision, ClientTradingDecisionResponse,
    Currency, SettlementResult, Side,
};
