#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use pomohub_common::id::{prefix, prefixed_ulid};
use space_api::auth::tokens::TokenKeys;
use space_api::config::Config;
use space_api::db::store::MemoryStore;
use space_api::gateway::hub::Hub;
use space_api::AppState;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config {
        port: 0,
        jwt_secret: TEST_SECRET.to_string(),
        database_url: None,
        outbound_buffer: 64,
        idle_timeout: None,
    }
}

/// Build a test AppState over an in-memory store and a fresh hub.
pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    state_with_config(test_config())
}

pub fn state_with_config(config: Config) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());

    let state = AppState {
        store: store.clone(),
        tokens: Arc::new(TokenKeys::from_secret(&config.jwt_secret)),
        config: Arc::new(config),
        hub: Hub::spawn(),
    };

    (state, store)
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState, Arc<MemoryStore>) {
    let (state, store) = test_state();
    let app = space_api::routes::router().with_state(state.clone());
    (app, state, store)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background.
pub async fn start_server() -> (SocketAddr, AppState, Arc<MemoryStore>) {
    start_server_with_config(test_config()).await
}

pub async fn start_server_with_config(config: Config) -> (SocketAddr, AppState, Arc<MemoryStore>) {
    let (state, store) = state_with_config(config);
    let app = space_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state, store)
}

/// Create a space with the given number of fresh members. Returns the space
/// id and the member ids.
pub fn seed_space(store: &MemoryStore, members: usize) -> (String, Vec<String>) {
    let space_id = prefixed_ulid(prefix::SPACE);
    let users = (0..members)
        .map(|_| {
            let user_id = prefixed_ulid(prefix::USER);
            store.add_member(&space_id, &user_id);
            user_id
        })
        .collect();
    (space_id, users)
}

pub fn token_for(state: &AppState, user_id: &str) -> String {
    state.tokens.issue(user_id).expect("issue test token")
}

/// Open a WebSocket to `/ws/{space_id}`.
pub async fn connect(addr: SocketAddr, space_id: &str, token: &str) -> WsClient {
    let url = format!("ws://{addr}/ws/{space_id}?token={token}");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws
}

/// Read the next text frame as JSON, skipping pings.
pub async fn next_event(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for event")
            .expect("stream ended")
            .expect("ws read error");

        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("parse event");
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Read events until one of type `kind` arrives.
pub async fn next_event_of(ws: &mut WsClient, kind: &str) -> serde_json::Value {
    loop {
        let event = next_event(ws).await;
        if event["type"] == kind {
            return event;
        }
    }
}

/// Wait for the server to close the connection and return the close code.
pub async fn expect_close(ws: &mut WsClient) -> u16 {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for close");

        match msg {
            Some(Ok(tungstenite::Message::Close(Some(frame)))) => return u16::from(frame.code),
            Some(Ok(tungstenite::Message::Close(None))) | None => {
                panic!("connection closed without a close code")
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => panic!("ws error before close frame: {e}"),
        }
    }
}

/// Poll the hub until `space_id` has exactly `expected` members.
pub async fn wait_for_members(state: &AppState, space_id: &str, expected: &[&str]) {
    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();

    for _ in 0..100 {
        if state.hub.members(space_id).await == expected {
            return;
        }
        time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "members of {space_id} never became {expected:?}, last saw {:?}",
        state.hub.members(space_id).await
    );
}
