//! Odds stream connection against an in-process websocket server.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use uuid::Uuid;

use sts_client::market::{EventStore, Period};
use sts_client::stream::{odds_url, open_stream, CloseReason, Heartbeat, StreamEvent, StreamMessage};

/// Accept one websocket connection and hand it to `script`.
async fn spawn_server<F, Fut>(script: F) -> Url
where
    F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        script(ws).await;
    });

    let base = Url::parse(&format!("ws://{}/longshot/", addr)).unwrap();
    odds_url(&base, Uuid::new_v4()).unwrap()
}

/// Next text frame, skipping control frames.
async fn next_text(
    ws: &mut tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
) -> Option<String> {
    while let Some(msg) = ws.next().await {
        match msg.ok()? {
            Message::Text(text) => return Some(text),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

#[tokio::test]
async fn heartbeats_are_echoed_and_updates_cached() {
    let (reply_tx, reply_rx) = oneshot::channel();

    let url = spawn_server(|mut ws| async move {
        ws.send(Message::Text(r#"{"heartbeat": {"id": 7}}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(
            r#"{"updates": [{
                "eventId": 101,
                "eventDescription": {"home": "Lions", "away": "Tigers"},
                "live": {"gameTime": {"period": "FIRST_HALF", "minute": 12}},
                "prices": [{"betType": ["MATCH_ODDS", "HOME"],
                            "back": {"price": 2.1, "maxStake": 200},
                            "lay": {"price": 2.2, "maxStake": 150}}]
            }]}"#
                .to_string(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(r#"{"updates": [{"eventId": 101, "prices": []}]}"#.to_string()))
            .await
            .unwrap();

        let reply = next_text(&mut ws).await;
        let _ = reply_tx.send(reply);

        let _ = ws
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "session over".into(),
            })))
            .await;
        while ws.next().await.is_some() {}
    })
    .await;

    let store = Arc::new(EventStore::new());
    let mut handle = open_stream(&url, store.clone()).await.unwrap();

    let mut updates = 0;
    let reason = loop {
        match tokio::time::timeout(Duration::from_secs(5), handle.recv()).await {
            Ok(Some(StreamEvent::Updates(_))) => updates += 1,
            Ok(Some(StreamEvent::Closed(reason))) => break reason,
            Ok(None) => panic!("observer channel closed without a close event"),
            Err(_) => panic!("timed out waiting for stream events"),
        }
    };

    assert_eq!(updates, 2);
    assert_eq!(
        reason,
        CloseReason::Peer {
            code: Some(1000),
            reason: "session over".to_string(),
        }
    );
    assert_eq!(
        reply_rx.await.unwrap().as_deref(),
        Some(r#"{"heartbeat":{"id":7}}"#)
    );

    let event = store.get(101).unwrap();
    assert_eq!(event.title(), "Lions v Tigers");
    assert_eq!(
        event.live.map(|l| l.game_time.period),
        Some(Period::FirstHalf)
    );
    assert!(event.prices.is_empty());

    let stats = handle.join().await.unwrap();
    assert_eq!(stats.heartbeats, 1);
    assert_eq!(stats.update_batches, 2);
}

#[tokio::test]
async fn application_frames_and_local_close_reach_the_server() {
    let (frames_tx, frames_rx) = oneshot::channel();

    let url = spawn_server(|mut ws| async move {
        let mut seen = Vec::new();
        while let Some(Ok(msg)) = ws.next().await {
            let is_close = msg.is_close();
            seen.push(msg);
            if is_close {
                break;
            }
        }
        let _ = frames_tx.send(seen);
    })
    .await;

    let store = Arc::new(EventStore::new());
    let mut handle = open_stream(&url, store).await.unwrap();
    assert!(handle.is_connected());

    handle
        .send(&StreamMessage::Heartbeat(Heartbeat { id: 5 }))
        .await
        .unwrap();

    // Let the loop flush the frame before closing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.close();

    let closed = tokio::time::timeout(Duration::from_secs(5), handle.recv())
        .await
        .unwrap();
    assert_eq!(closed, Some(StreamEvent::Closed(CloseReason::Local)));

    let stats = handle.join().await.unwrap();
    assert_eq!(stats.messages, 0);

    let frames = frames_rx.await.unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], Message::Text(r#"{"heartbeat":{"id":5}}"#.to_string()));
    assert!(frames[1].is_close());
}

#[tokio::test]
async fn connect_failure_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{}/odds?token=x", addr)).unwrap();
    let result = open_stream(&url, Arc::new(EventStore::new())).await;

    assert!(matches!(
        result,
        Err(sts_client::error::StreamError::ConnectionFailed(_))
    ));
}
