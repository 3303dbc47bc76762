//! Bet advice, confirmation and settlement types.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

use crate::market::{EventId, EventUpdate, Odds};

/// Side of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Side {
    /// Back the selection.
    Back,
    /// Lay the selection.
    Lay,
}

/// Stake currency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Currency {
    /// Euro.
    #[default]
    Eur,
    /// Pound sterling.
    Gbp,
    /// US dollar.
    Usd,
}

/// Status the venue attaches to a bet.
///
/// Statuses other than the three the lifecycle acts on are kept verbatim so
/// they can be echoed back in the confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdviceStatus {
    /// Venue takes the bet at the returned terms.
    Accepted,
    /// Provisional; poll until resolved.
    Pending,
    /// Venue declines the bet.
    Rejected,
    /// Any other status, treated as final.
    Other(String),
}

impl AdviceStatus {
    /// Check if the status is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AdviceStatus::Pending)
    }

    /// Wire form of the status.
    pub fn as_str(&self) -> &str {
        match self {
            AdviceStatus::Accepted => "ACCEPTED",
            AdviceStatus::Pending => "PENDING",
            AdviceStatus::Rejected => "REJECTED",
            AdviceStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for AdviceStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ACCEPTED" => AdviceStatus::Accepted,
            "PENDING" => AdviceStatus::Pending,
            "REJECTED" => AdviceStatus::Rejected,
            _ => AdviceStatus::Other(raw),
        }
    }
}

impl From<AdviceStatus> for String {
    fn from(status: AdviceStatus) -> Self {
        match status {
            AdviceStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for AdviceStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AdviceStatus::from(s.to_string()))
    }
}

impl fmt::Display for AdviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a bet is attributed to. Carried into every advice request unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    /// Account ids from senior to leaf.
    pub account_hierarchy: Vec<String>,
    /// End customer.
    pub end_punter_id: String,
    /// Account placing the bet.
    pub account_id: String,
    /// Stake currency.
    pub currency: Currency,
    /// Fraction of the position the account takes.
    pub position_taking: Decimal,
}

/// Proposed terms of a bet, before a bet id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetTerms {
    /// Event to bet on.
    pub event_id: EventId,
    /// Bet type classification, copied from the price record.
    pub bet_type: Vec<String>,
    /// Requested price.
    pub price: Decimal,
    /// Requested stake.
    pub stake: Decimal,
    /// Largest stake the requester would honor.
    pub punter_max_stake: Decimal,
    /// Side.
    pub side: Side,
    /// Attribution.
    pub attribution: Attribution,
}

impl BetTerms {
    /// Back the given price record at its quoted price, staking
    /// `stake_fraction` of the quoted max stake.
    ///
    /// Returns `None` when the record has no back quote.
    pub fn back_from_quote(
        event: &EventUpdate,
        odds: &Odds,
        stake_fraction: Decimal,
        attribution: Attribution,
    ) -> Option<Self> {
        let back = odds.back?;
        Some(Self {
            event_id: event.event_id,
            bet_type: odds.bet_type.clone(),
            price: back.price,
            stake: back.max_stake * stake_fraction,
            punter_max_stake: back.max_stake,
            side: Side::Back,
            attribution,
        })
    }

    /// Build the advice request for a freshly assigned bet id.
    pub fn to_request(&self, unique_id: &str, timestamp: OffsetDateTime) -> BetAdviceRequest {
        BetAdviceRequest {
            timestamp,
            event_id: self.event_id,
            bet_type: self.bet_type.clone(),
            account_hierarchy: self.attribution.account_hierarchy.clone(),
            end_punter_id: self.attribution.end_punter_id.clone(),
            account_id: self.attribution.account_id.clone(),
            currency: self.attribution.currency,
            punter_max_stake: self.punter_max_stake,
            price: self.price,
            stake: self.stake,
            side: self.side,
            unique_id: unique_id.to_string(),
            position_taking: self.attribution.position_taking,
        }
    }
}

/// Advice request body (`POST advice`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetAdviceRequest {
    /// Request time.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Event id.
    pub event_id: EventId,
    /// Bet type classification.
    pub bet_type: Vec<String>,
    /// Account ids from senior to leaf.
    pub account_hierarchy: Vec<String>,
    /// End customer.
    pub end_punter_id: String,
    /// Account id.
    pub account_id: String,
    /// Currency.
    pub currency: Currency,
    /// Largest stake the requester would honor.
    #[serde(with = "rust_decimal::serde::float")]
    pub punter_max_stake: Decimal,
    /// Requested price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Requested stake.
    #[serde(with = "rust_decimal::serde::float")]
    pub stake: Decimal,
    /// Side.
    pub side: Side,
    /// Client-generated bet id.
    pub unique_id: String,
    /// Position-taking fraction.
    #[serde(with = "rust_decimal::serde::float")]
    pub position_taking: Decimal,
}

/// Advice (and status) response.
///
/// Price and stake are authoritative for the confirmation and are absent on
/// rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetAdviceResponse {
    /// Advice status.
    pub status: AdviceStatus,
    /// Price the venue will honor.
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Stake the venue will honor.
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stake: Option<Decimal>,
    /// Free-text reason, when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BetAdviceResponse {
    /// Response with terms.
    pub fn with_terms(status: AdviceStatus, price: Decimal, stake: Decimal) -> Self {
        Self {
            status,
            price: Some(price),
            stake: Some(stake),
            reason: None,
        }
    }

    /// Rejection without terms.
    pub fn rejected() -> Self {
        Self {
            status: AdviceStatus::Rejected,
            price: None,
            stake: None,
            reason: None,
        }
    }
}

/// Confirmation body (`POST advice/{id}/confirmation`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTradingDecision {
    /// Status being acknowledged.
    pub status: AdviceStatus,
    /// Currency.
    pub currency: Currency,
    /// Price acknowledged; never set on rejection.
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Stake acknowledged; never set on rejection.
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub stake: Option<Decimal>,
}

impl ClientTradingDecision {
    /// Follow the advice exactly as received.
    pub fn follow(advice: &BetAdviceResponse, currency: Currency) -> Self {
        let rejected = advice.status == AdviceStatus::Rejected;
        Self {
            status: advice.status.clone(),
            currency,
            price: if rejected { None } else { advice.price },
            stake: if rejected { None } else { advice.stake },
        }
    }
}

/// Confirmation acknowledgement. Not interpreted by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientTradingDecisionResponse {
    /// Whatever the venue returned.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Final result of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SettlementResult {
    /// Bet won.
    Win,
    /// Bet lost.
    Lose,
    /// Bet voided.
    Void,
}

/// One settled bet (`POST settlement`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetSettlement {
    /// Bet id used for the advice.
    pub unique_id: String,
    /// Result.
    pub result: SettlementResult,
    /// Settlement time.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Settlement acknowledgement. Not interpreted by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetSettlementResponse {
    /// Whatever the venue returned.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Quote;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn attribution() -> Attribution {
        Attribution {
            account_hierarchy: vec!["senior_01".to_string(), "agent_02".to_string()],
            end_punter_id: "username_123".to_string(),
            account_id: "senior_01agent_02".to_string(),
            currency: Currency::Eur,
            position_taking: dec!(0.5),
        }
    }

    #[test]
    fn decision_follows_accepted_terms() {
        let advice = BetAdviceResponse::with_terms(AdviceStatus::Accepted, dec!(2.1), dec!(40));
        let decision = ClientTradingDecision::follow(&advice, Currency::Eur);

        assert_eq!(decision.status, AdviceStatus::Accepted);
        assert_eq!(decision.price, Some(dec!(2.1)));
        assert_eq!(decision.stake, Some(dec!(40)));
    }

    #[test]
    fn rejection_never_carries_terms() {
        let mut advice = BetAdviceResponse::with_terms(AdviceStatus::Rejected, dec!(2.1), dec!(40));
        advice.reason = Some("liability".to_string());
        let decision = ClientTradingDecision::follow(&advice, Currency::Gbp);

        assert_eq!(decision.price, None);
        assert_eq!(decision.stake, None);
        assert_eq!(
            serde_json::to_value(&decision).unwrap(),
            serde_json::json!({"status": "REJECTED", "currency": "GBP"})
        );
    }

    #[test]
    fn advice_request_wire_shape() {
        let terms = BetTerms {
            event_id: 77,
            bet_type: vec!["MATCH_ODDS".to_string(), "AWAY".to_string()],
            price: dec!(3.5),
            stake: dec!(25),
            punter_max_stake: dec!(50),
            side: Side::Back,
            attribution: attribution(),
        };
        let request = terms.to_request("bet-1", time::macros::datetime!(2024-05-01 12:00 UTC));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["eventId"], 77);
        assert_eq!(json["uniqueId"], "bet-1");
        assert_eq!(json["side"], "BACK");
        assert_eq!(json["currency"], "EUR");
        assert_eq!(json["price"], 3.5);
        assert_eq!(json["punterMaxStake"], 50.0);
        assert_eq!(json["positionTaking"], 0.5);
        assert_eq!(json["accountHierarchy"], serde_json::json!(["senior_01", "agent_02"]));
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn advice_response_decodes_numbers() {
        let resp: BetAdviceResponse =
            serde_json::from_str(r#"{"status": "PENDING", "price": 1.95, "stake": 10}"#).unwrap();
        assert_eq!(resp, BetAdviceResponse::with_terms(AdviceStatus::Pending, dec!(1.95), dec!(10)));

        let rejected: BetAdviceResponse = serde_json::from_str(r#"{"status": "REJECTED"}"#).unwrap();
        assert_eq!(rejected, BetAdviceResponse::rejected());
    }

    #[test]
    fn unknown_status_is_kept_and_echoed() {
        let advice: BetAdviceResponse =
            serde_json::from_str(r#"{"status": "VOIDED", "price": 2.0, "stake": 5}"#).unwrap();
        assert_eq!(advice.status, AdviceStatus::Other("VOIDED".to_string()));
        assert!(advice.status.is_terminal());

        let decision = ClientTradingDecision::follow(&advice, Currency::Eur);
        assert_eq!(
            serde_json::to_value(&decision).unwrap(),
            serde_json::json!({"status": "VOIDED", "currency": "EUR", "price": 2.0, "stake": 5.0})
        );
    }

    #[test]
    fn terms_from_quote_stake_a_fraction_of_max() {
        let odds = Odds {
            bet_type: vec!["MATCH_ODDS".to_string(), "HOME".to_string()],
            back: Some(Quote::new(dec!(1.8), dec!(200))),
            lay: None,
        };
        let event = EventUpdate::prices_only(5, vec![odds.clone()]);
        let terms = BetTerms::back_from_quote(&event, &odds, dec!(0.5), attribution()).unwrap();

        assert_eq!(terms.price, dec!(1.8));
        assert_eq!(terms.stake, dec!(100));
        assert_eq!(terms.punter_max_stake, dec!(200));
        assert_eq!(terms.side, Side::Back);

        let lay_only = Odds { back: None, ..odds };
        assert!(BetTerms::back_from_quote(&event, &lay_only, dec!(0.5), attribution()).is_none());
    }

    #[test]
    fn enums_parse_from_strings() {
        assert_eq!(AdviceStatus::from_str("pending").unwrap(), AdviceStatus::Pending);
        assert_eq!(Currency::from_str("gbp").unwrap(), Currency::Gbp);
        assert_eq!(SettlementResult::from_str("void").unwrap(), SettlementResult::Void);
        assert_eq!(AdviceStatus::Pending.to_string(), "PENDING");
        assert_eq!(Currency::Eur.to_string(), "EUR");
        assert!(AdviceStatus::Accepted.is_terminal());
        assert!(!AdviceStatus::Pending.is_terminal());
    }
}
