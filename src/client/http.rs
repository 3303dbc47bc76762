//! REST client for the venue API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::traits::BettingApi;
use super::types::{AuthRequest, AuthResponse, ErrorResponse};
use crate::betting::types::{
    BetAdviceRequest, BetAdviceResponse, BetSettlement, BetSettlementResponse,
    ClientTradingDecision, ClientTradingDecisionResponse,
};
use crate::config::Config;
use crate::error::{ApiError, StsError};
use crate::metrics;
use crate::stream::odds_url;

/// Venue API client.
#[derive(Debug, Clone)]
pub struct StsClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for REST calls, ending in `/`.
    rest_base: Url,
    /// Base URL for the odds stream, ending in `/`.
    stream_base: Url,
}

impl StsClient {
    /// Create a client for explicit base URLs.
    pub fn new(rest_base: Url, stream_base: Url, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            rest_base,
            stream_base,
        })
    }

    /// Create a client from config.
    pub fn from_config(config: &Config) -> Result<Self, StsError> {
        let rest_base = config
            .rest_base_url()
            .map_err(|e| StsError::InvalidConfig(format!("STS_API_ROOT: {}", e)))?;
        let stream_base = config
            .stream_base_url()
            .map_err(|e| StsError::InvalidConfig(format!("STS_API_ROOT: {}", e)))?;

        Ok(Self::new(rest_base, stream_base, config.http_timeout())?)
    }

    /// Base URL for REST calls.
    pub fn rest_base(&self) -> &Url {
        &self.rest_base
    }

    /// Odds stream URL for a session token.
    pub fn odds_url(&self, token: Uuid) -> Result<Url, ApiError> {
        odds_url(&self.stream_base, token).map_err(|e| ApiError::Transport(e.to_string()))
    }

    /// Log in and obtain a session token.
    #[instrument(skip(self, password))]
    pub async fn auth(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.do_post("auth", "auth", &body).await
    }

    /// Report settled bets.
    #[instrument(skip(self, settlements), fields(count = settlements.len()))]
    pub async fn settlement(
        &self,
        settlements: &[BetSettlement],
    ) -> Result<BetSettlementResponse, ApiError> {
        self.do_post("settlement", "settlement", &settlements).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.rest_base
            .join(path)
            .map_err(|e| ApiError::Transport(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn do_post<Req, Resp>(
        &self,
        path: &str,
        label: &'static str,
        body: &Req,
    ) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(url = %url, "POST");
        self.do_request(self.http.post(url).json(body), label).await
    }

    async fn do_get<Resp>(&self, path: &str, label: &'static str) -> Result<Resp, ApiError>
    where
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(url = %url, "GET");
        self.do_request(self.http.get(url), label).await
    }

    async fn do_request<Resp>(
        &self,
        request: reqwest::RequestBuilder,
        label: &'static str,
    ) -> Result<Resp, ApiError>
    where
        Resp: DeserializeOwned,
    {
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        metrics::record_http_latency(start, label);

        if !status.is_success() {
            let error = serde_json::from_str::<ErrorResponse>(&body)
                .unwrap_or_else(|_| ErrorResponse::raw(body));
            warn!(endpoint = label, code = status.as_u16(), error = %error, "API error");
            return Err(ApiError::Application {
                code: status.as_u16(),
                body: error,
            });
        }

        // Acknowledgement endpoints may answer with an empty body.
        let text = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| ApiError::Decode(format!("{}: {}", label, e)))
    }
}

#[async_trait]
impl BettingApi for StsClient {
    #[instrument(skip(self, request), fields(bet_id = %request.unique_id, event_id = request.event_id))]
    async fn advice(&self, request: &BetAdviceRequest) -> Result<BetAdviceResponse, ApiError> {
        self.do_post("advice", "advice", request).await
    }

    #[instrument(skip(self))]
    async fn status(&self, bet_id: &str) -> Result<BetAdviceResponse, ApiError> {
        self.do_get(&format!("advice/{}", bet_id), "status").await
    }

    #[instrument(skip(self, decision), fields(status = %decision.status))]
    async fn confirm(
        &self,
        bet_id: &str,
        decision: &ClientTradingDecision,
    ) -> Result<ClientTradingDecisionResponse, ApiError> {
        self.do_post(&format!("advice/{}/confirmation", bet_id), "confirmation", decision)
            .await
    }
}
