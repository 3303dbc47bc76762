//! REST client and bet lifecycle against a fake venue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;
use uuid::Uuid;

use sts_client::betting::{
    AdviceStatus, Attribution, BetLifecycleController, BetSettlement, BetState, BetTerms,
    Currency, SettlementResult, Side,
};
use sts_client::client::{BettingApi, StsClient};
use sts_client::error::{ApiError, BetError};

const TOKEN: &str = "6f1c2b8e-6a53-4c1e-9d39-0a4b6f3e2d11";

#[derive(Default)]
struct Venue {
    advice: VecDeque<Value>,
    status: VecDeque<Value>,
    advice_bodies: Vec<Value>,
    status_polls: Vec<String>,
    confirmations: Vec<(String, Value)>,
    settlements: Vec<Value>,
}

type Shared = Arc<Mutex<Venue>>;

async fn auth(Json(body): Json<Value>) -> Response {
    if body["username"] == "user" && body["password"] == "secret" {
        Json(json!({ "token": TOKEN })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": "AUTH_FAILED", "message": "bad credentials" })),
        )
            .into_response()
    }
}

async fn advice(State(venue): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut venue = venue.lock().unwrap();
    venue.advice_bodies.push(body);
    match venue.advice.pop_front() {
        Some(resp) => Json(resp).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": "NO_MARKET", "message": "event not offered" })),
        )
            .into_response(),
    }
}

async fn status(State(venue): State<Shared>, Path(bet_id): Path<String>) -> Response {
    let mut venue = venue.lock().unwrap();
    venue.status_polls.push(bet_id);
    match venue.status.pop_front() {
        Some(resp) => Json(resp).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown bet").into_response(),
    }
}

async fn confirmation(
    State(venue): State<Shared>,
    Path(bet_id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    venue.lock().unwrap().confirmations.push((bet_id, body));
    StatusCode::OK
}

async fn settlement(State(venue): State<Shared>, Json(body): Json<Vec<Value>>) -> Json<Value> {
    let count = body.len();
    venue.lock().unwrap().settlements.extend(body);
    Json(json!({ "settled": count }))
}

async fn spawn_venue() -> (StsClient, Shared) {
    let venue: Shared = Arc::new(Mutex::new(Venue::default()));
    let app = Router::new()
        .route("/api/auth", post(auth))
        .route("/api/advice", post(advice))
        .route("/api/advice/:bet_id", get(status))
        .route("/api/advice/:bet_id/confirmation", post(confirmation))
        .route("/api/settlement", post(settlement))
        .with_state(venue.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = StsClient::new(
        Url::parse(&format!("http://{}/api/", addr)).unwrap(),
        Url::parse(&format!("ws://{}/api/", addr)).unwrap(),
        Duration::from_secs(5),
    )
    .unwrap();

    (client, venue)
}

fn terms() -> BetTerms {
    BetTerms {
        event_id: 1234,
        bet_type: vec!["MATCH_ODDS".to_string(), "HOME".to_string()],
        price: dec!(2.5),
        stake: dec!(50),
        punter_max_stake: dec!(100),
        side: Side::Back,
        attribution: Attribution {
            account_hierarchy: vec!["senior_01".to_string(), "agent_02".to_string()],
            end_punter_id: "username_123".to_string(),
            account_id: "senior_01agent_02".to_string(),
            currency: Currency::Eur,
            position_taking: dec!(0.5),
        },
    }
}

#[tokio::test]
async fn auth_returns_session_token() {
    let (client, _venue) = spawn_venue().await;

    let auth = client.auth("user", "secret").await.unwrap();
    assert_eq!(auth.token, Uuid::parse_str(TOKEN).unwrap());

    let url = client.odds_url(auth.token).unwrap();
    assert_eq!(url.path(), "/api/odds");
    assert_eq!(url.query(), Some(format!("token={}", TOKEN).as_str()));
}

#[tokio::test]
async fn rejected_login_carries_error_body() {
    let (client, _venue) = spawn_venue().await;

    let err = client.auth("user", "wrong").await.unwrap_err();
    match err {
        ApiError::Application { code, body } => {
            assert_eq!(code, 401);
            assert_eq!(body.code.as_deref(), Some("AUTH_FAILED"));
            assert_eq!(body.message.as_deref(), Some("bad credentials"));
        }
        other => panic!("expected application error, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_error_body_is_kept_raw() {
    let (client, _venue) = spawn_venue().await;

    let err = client.status("missing").await.unwrap_err();
    assert_eq!(err.code(), Some(404));
    if let ApiError::Application { body, .. } = err {
        assert_eq!(body.message.as_deref(), Some("unknown bet"));
    }
}

#[tokio::test]
async fn pending_bet_runs_full_lifecycle() {
    let (client, venue) = spawn_venue().await;
    {
        let mut v = venue.lock().unwrap();
        v.advice
            .push_back(json!({ "status": "PENDING", "price": 2.5, "stake": 50 }));
        v.status
            .push_back(json!({ "status": "PENDING", "price": 2.5, "stake": 50 }));
        v.status
            .push_back(json!({ "status": "ACCEPTED", "price": 2.4, "stake": 45.5 }));
    }

    let outcome = BetLifecycleController::new(&client)
        .with_poll_interval(Duration::from_millis(10))
        .place(terms())
        .await
        .unwrap();

    assert_eq!(outcome.state, BetState::Accepted);
    assert_eq!(outcome.polls, 2);
    assert_eq!(outcome.confirmations, 2);

    let v = venue.lock().unwrap();
    assert_eq!(v.advice_bodies.len(), 1);
    let sent = &v.advice_bodies[0];
    assert_eq!(sent["uniqueId"], outcome.bet_id.as_str());
    assert_eq!(sent["eventId"], 1234);
    assert_eq!(sent["side"], "BACK");
    assert_eq!(sent["stake"], 50.0);
    assert_eq!(sent["accountId"], "senior_01agent_02");

    assert_eq!(v.status_polls, vec![outcome.bet_id.clone(), outcome.bet_id.clone()]);

    assert_eq!(v.confirmations.len(), 2);
    assert!(v.confirmations.iter().all(|(id, _)| *id == outcome.bet_id));
    assert_eq!(
        v.confirmations[0].1,
        json!({ "status": "PENDING", "currency": "EUR", "price": 2.5, "stake": 50.0 })
    );
    assert_eq!(
        v.confirmations[1].1,
        json!({ "status": "ACCEPTED", "currency": "EUR", "price": 2.4, "stake": 45.5 })
    );
}

#[tokio::test]
async fn rejected_bet_is_confirmed_without_terms() {
    let (client, venue) = spawn_venue().await;
    venue
        .lock()
        .unwrap()
        .advice
        .push_back(json!({ "status": "REJECTED" }));

    let outcome = BetLifecycleController::new(&client)
        .place(terms())
        .await
        .unwrap();

    assert_eq!(outcome.state, BetState::Rejected);
    let v = venue.lock().unwrap();
    assert_eq!(
        v.confirmations[0].1,
        json!({ "status": "REJECTED", "currency": "EUR" })
    );
    assert!(v.status_polls.is_empty());
}

#[tokio::test]
async fn advice_error_surfaces_with_bet_id() {
    let (client, venue) = spawn_venue().await;

    let err = BetLifecycleController::new(&client)
        .place(terms())
        .await
        .unwrap_err();

    match &err {
        BetError::Advice { source, .. } => assert_eq!(source.code(), Some(400)),
        other => panic!("expected advice error, got {:?}", other),
    }
    assert!(err.bet_id().is_some());
    assert!(venue.lock().unwrap().confirmations.is_empty());
}

#[tokio::test]
async fn confirmation_accepts_empty_body() {
    let (client, venue) = spawn_venue().await;
    venue
        .lock()
        .unwrap()
        .advice
        .push_back(json!({ "status": "ACCEPTED", "price": 2.5, "stake": 50 }));

    let advice = client
        .advice(&terms().to_request("bet-42", time::OffsetDateTime::now_utc()))
        .await
        .unwrap();
    assert_eq!(advice.status, AdviceStatus::Accepted);

    let decision = sts_client::betting::ClientTradingDecision::follow(&advice, Currency::Eur);
    let ack = client.confirm("bet-42", &decision).await.unwrap();
    assert!(ack.fields.is_empty());
}

#[tokio::test]
async fn settlement_posts_a_list() {
    let (client, venue) = spawn_venue().await;

    let settlements = vec![BetSettlement {
        unique_id: "bet-1".to_string(),
        result: SettlementResult::Win,
        timestamp: time::macros::datetime!(2024-05-01 18:00 UTC),
    }];
    let response = client.settlement(&settlements).await.unwrap();

    assert_eq!(response.fields["settled"], 1);
    let v = venue.lock().unwrap();
    assert_eq!(
        v.settlements,
        vec![json!({
            "uniqueId": "bet-1",
            "result": "WIN",
            "timestamp": "2024-05-01T18:00:00Z"
        })]
    );
}
