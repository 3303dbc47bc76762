//! Market data types carried on the odds stream.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable identifier of a tradable event.
pub type EventId = i64;

/// Home/away description of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescription {
    /// Home team.
    pub home: String,
    /// Away team.
    pub away: String,
}

/// Match period reported while an event is live.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Period {
    /// Before kick-off.
    NotStarted,
    /// First half in play.
    FirstHalf,
    /// Half-time break.
    HalfTime,
    /// Second half in play.
    SecondHalf,
    /// Full time.
    FullTime,
    /// Any period this client does not know about.
    #[serde(other)]
    Other,
}

impl Period {
    /// Check if the ball is in play.
    pub fn is_inplay(&self) -> bool {
        matches!(self, Period::FirstHalf | Period::SecondHalf)
    }
}

/// Game clock of a live event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTime {
    /// Current period.
    pub period: Period,
    /// Elapsed minutes, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
}

/// Live state of an event. Present only while the event is in an active phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveData {
    /// Game clock.
    pub game_time: GameTime,
}

/// One side of a price record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Decimal price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Maximum stake the venue accepts at this price.
    #[serde(with = "rust_decimal::serde::float")]
    pub max_stake: Decimal,
}

impl Quote {
    /// Create a new quote.
    pub fn new(price: Decimal, max_stake: Decimal) -> Self {
        Self { price, max_stake }
    }
}

/// Price record for one bet type: back and lay quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Odds {
    /// Bet type classification, e.g. `["MATCH_ODDS", "HOME"]`.
    pub bet_type: Vec<String>,
    /// Back quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<Quote>,
    /// Lay quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lay: Option<Quote>,
}

impl Odds {
    /// Bet type joined with commas.
    pub fn bet_type_label(&self) -> String {
        self.bet_type.join(",")
    }

    /// Render as a price-board line. Absent sides show as 0.
    pub fn board_line(&self) -> String {
        let back = self.back.map(|q| q.price).unwrap_or(Decimal::ZERO);
        let lay = self.lay.map(|q| q.price).unwrap_or(Decimal::ZERO);
        format!("{:<15} -> Back: {}\tLay: {}", self.bet_type_label(), back, lay)
    }
}

/// State of one event.
///
/// The same shape is used for a delta on the wire and for the merged snapshot
/// held by [`EventStore`](super::EventStore). In a delta, an absent
/// description or live state means "unchanged"; the price list is always the
/// freshest available and replaces whatever was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    /// Event id.
    pub event_id: EventId,
    /// Teams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_description: Option<EventDescription>,
    /// Live state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live: Option<LiveData>,
    /// Current prices. Missing on the wire decodes as empty.
    #[serde(default)]
    pub prices: Vec<Odds>,
}

impl EventUpdate {
    /// Create an update carrying only prices.
    pub fn prices_only(event_id: EventId, prices: Vec<Odds>) -> Self {
        Self {
            event_id,
            event_description: None,
            live: None,
            prices,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, home: impl Into<String>, away: impl Into<String>) -> Self {
        self.event_description = Some(EventDescription {
            home: home.into(),
            away: away.into(),
        });
        self
    }

    /// Set the live period.
    pub fn with_period(mut self, period: Period) -> Self {
        self.live = Some(LiveData {
            game_time: GameTime {
                period,
                minute: None,
            },
        });
        self
    }

    /// Check if the event is in play (first or second half).
    pub fn is_inplay(&self) -> bool {
        self.live
            .as_ref()
            .map(|l| l.game_time.period.is_inplay())
            .unwrap_or(false)
    }

    /// Check if the event carries any prices.
    pub fn has_prices(&self) -> bool {
        !self.prices.is_empty()
    }

    /// "Home v Away", or the event id when no description is known.
    pub fn title(&self) -> String {
        match &self.event_description {
            Some(d) => format!("{} v {}", d.home, d.away),
            None => format!("event {}", self.event_id),
        }
    }
}
