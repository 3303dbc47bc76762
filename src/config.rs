//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::betting::types::{Attribution, Currency};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Venue Credentials ===
    /// Login name.
    pub sts_username: String,

    /// Login password.
    pub sts_password: String,

    /// Host and path prefix of the API, without scheme
    /// (e.g. `venue.example.com/longshot/STS/2.0.0/`).
    pub sts_api_root: String,

    /// Use https/wss instead of http/ws.
    #[serde(default)]
    pub sts_tls: bool,

    /// Per-request HTTP timeout in milliseconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    // === Betting ===
    /// Wait between status polls of a pending bet, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub bet_poll_interval_ms: u64,

    /// Update messages to receive before placing the sample bet.
    #[serde(default = "default_bet_after")]
    pub bet_after_messages: u64,

    /// Account ids from senior to leaf, comma separated in the environment.
    #[serde(default = "default_account_hierarchy")]
    pub account_hierarchy: Vec<String>,

    /// End customer the bet is attributed to.
    #[serde(default = "default_end_punter_id")]
    pub end_punter_id: String,

    /// Account placing the bet.
    #[serde(default = "default_account_id")]
    pub account_id: String,

    /// Stake currency.
    #[serde(default)]
    pub currency: Currency,

    /// Fraction of the quoted max stake to request (0 < f <= 1).
    #[serde(default = "default_fraction")]
    pub stake_fraction: Decimal,

    /// Position-taking fraction (0 <= f <= 1).
    #[serde(default = "default_fraction")]
    pub position_taking: Decimal,

    // === Server Configuration ===
    /// HTTP server port for the status API.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Serve Prometheus metrics.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Prometheus exporter port.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_http_timeout() -> u64 {
    10_000
}

fn default_poll_interval() -> u64 {
    1_000
}

fn default_bet_after() -> u64 {
    10
}

fn default_account_hierarchy() -> Vec<String> {
    vec!["senior_01".to_string(), "agent_02".to_string()]
}

fn default_end_punter_id() -> String {
    "username_123".to_string()
}

fn default_account_id() -> String {
    "senior_01agent_02".to_string()
}

fn default_fraction() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.sts_username.is_empty() {
            return Err("STS_USERNAME is required".to_string());
        }

        if self.sts_password.is_empty() {
            return Err("STS_PASSWORD is required".to_string());
        }

        if self.sts_api_root.is_empty() {
            return Err("STS_API_ROOT is required".to_string());
        }

        if self.sts_api_root.contains("://") {
            return Err("STS_API_ROOT must not include a scheme, use STS_TLS instead".to_string());
        }

        if self.bet_poll_interval_ms == 0 {
            return Err("BET_POLL_INTERVAL_MS must be greater than 0".to_string());
        }

        if self.stake_fraction <= Decimal::ZERO || self.stake_fraction > Decimal::ONE {
            return Err("STAKE_FRACTION must be in (0, 1]".to_string());
        }

        if self.position_taking < Decimal::ZERO || self.position_taking > Decimal::ONE {
            return Err("POSITION_TAKING must be in [0, 1]".to_string());
        }

        if self.account_hierarchy.iter().all(|a| a.trim().is_empty()) {
            return Err("ACCOUNT_HIERARCHY must name at least one account".to_string());
        }

        Ok(())
    }

    /// API root with a trailing slash.
    fn root(&self) -> String {
        let root = self.sts_api_root.trim();
        if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{}/", root)
        }
    }

    /// Base URL for REST calls.
    pub fn rest_base_url(&self) -> Result<Url, url::ParseError> {
        let scheme = if self.sts_tls { "https" } else { "http" };
        Url::parse(&format!("{}://{}", scheme, self.root()))
    }

    /// Base URL for the odds stream.
    pub fn stream_base_url(&self) -> Result<Url, url::ParseError> {
        let scheme = if self.sts_tls { "wss" } else { "ws" };
        Url::parse(&format!("{}://{}", scheme, self.root()))
    }

    /// Per-request HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Wait between status polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.bet_poll_interval_ms)
    }

    /// Attribution carried by every bet placed with this config.
    pub fn attribution(&self) -> Attribution {
        Attribution {
            account_hierarchy: self.account_hierarchy.clone(),
            end_punter_id: self.end_punter_id.clone(),
            account_id: self.account_id.clone(),
            currency: self.currency,
            position_taking: self.position_taking,
        }
    }
}
