mod support;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect() -> Ws {
    let (ws, _) = connect_async(support::ws_url())
        .await
        .expect("websocket handshake should succeed");
    ws
}

async fn send(ws: &mut Ws, msg: Value) {
    ws.send(Message::text(msg.to_string()))
        .await
        .expect("send should succeed");
}

/// Reads until a message of `kind` arrives, skipping world snapshots and the like.
async fn next_of(ws: &mut Ws, kind: &str) -> Value {
    let wait = async {
        while let Some(frame) = ws.next().await {
            let frame = frame.expect("websocket frame");
            let Message::Text(text) = frame else {
                continue;
            };
            let value: Value = serde_json::from_str(text.as_str()).expect("server sends json");
            if value["type"] == kind {
                return value;
            }
        }
        panic!("connection closed before {kind}");
    };
    timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {kind}"))
}

fn unique_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("t{}", &id[..12])
}

#[tokio::test]
async fn when_character_is_selected_then_client_gets_selection_and_appears_in_world_state() {
    let mut ws = connect().await;
    let identity = next_of(&mut ws, "identity").await;
    let session_id = identity["data"]["sessionId"].as_u64().expect("session id");

    let name = unique_name();
    send(
        &mut ws,
        json!({ "type": "selectCharacter", "data": { "name": name, "className": "warrior" } }),
    )
    .await;

    let selected = next_of(&mut ws, "characterSelected").await;
    assert_eq!(selected["data"]["name"], name.as_str());
    assert_eq!(selected["data"]["className"], "warrior");
    assert_eq!(selected["data"]["sessionId"], session_id);
    assert_eq!(selected["data"]["level"], 1);

    // The next snapshots should include us.
    let mut seen = false;
    for _ in 0..20 {
        let state = next_of(&mut ws, "worldState").await;
        let players = state["data"]["players"].as_array().expect("players array");
        if players.iter().any(|p| p["sessionId"] == session_id) {
            seen = true;
            break;
        }
    }
    assert!(seen, "player never appeared in world state");
}

#[tokio::test]
async fn when_name_has_symbols_then_selection_is_rejected() {
    let mut ws = connect().await;
    next_of(&mut ws, "identity").await;

    send(
        &mut ws,
        json!({ "type": "selectCharacter", "data": { "name": "no spaces!", "className": "warrior" } }),
    )
    .await;

    let rejected = next_of(&mut ws, "actionRejected").await;
    assert_eq!(rejected["data"]["action"], "selectCharacter");
    assert_eq!(rejected["data"]["reason"], "INVALID_NAME");
}

#[tokio::test]
async fn when_request_arrives_before_selection_then_not_in_world() {
    let mut ws = connect().await;
    next_of(&mut ws, "identity").await;

    send(&mut ws, json!({ "type": "respawn" })).await;

    let rejected = next_of(&mut ws, "actionRejected").await;
    assert_eq!(rejected["data"]["action"], "respawn");
    assert_eq!(rejected["data"]["reason"], "NOT_IN_WORLD");
}

#[tokio::test]
async fn when_class_is_unknown_then_selection_is_rejected() {
    let mut ws = connect().await;
    next_of(&mut ws, "identity").await;

    send(
        &mut ws,
        json!({ "type": "selectCharacter", "data": { "name": unique_name(), "className": "bard" } }),
    )
    .await;

    let rejected = next_of(&mut ws, "actionRejected").await;
    assert_eq!(rejected["data"]["reason"], "UNKNOWN_CLASS");
}

#[tokio::test]
async fn when_health_is_requested_then_server_reports_ok() {
    support::ensure_server();
    let res = reqwest::get(support::http_url("/health"))
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.expect("json body");
    assert_eq!(body["status"], "ok");
}
