//! WebSocket upgrade handler and per-connection session loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time;

use crate::AppState;

use super::connection::{ConnectionRecord, ConnectionSink};
use super::events::{ClientMessage, Event, EventType};
use super::hub::Membership;
use super::session;

/// Close code sent when the hub closes a connection.
const CLOSE_NORMAL: u16 = 1000;

/// Query parameters of the upgrade request. Browser WebSocket clients cannot
/// set an `Authorization` header, so the bearer token travels here.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/{space_id}", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    Query(params): Query<ConnectParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, space_id, params.token))
}

async fn handle_connection(
    socket: WebSocket,
    state: AppState,
    raw_space_id: String,
    token: Option<String>,
) {
    let (mut ws_tx, ws_rx) = socket.split();

    let identity = match session::authorize(&state, &raw_space_id, token.as_deref()).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::debug!(%err, space_id = %raw_space_id, "session rejected");
            let _ = send_close(&mut ws_tx, err.close_code(), &err.to_string()).await;
            return;
        }
    };

    let (sink, outbound) = ConnectionSink::channel(state.config.outbound_buffer);
    let record = ConnectionRecord::new(identity.space_id, identity.user_id, sink);
    let membership = state.hub.join(record);
    membership.publish(Event::user_joined(membership.space_id(), membership.user_id()));

    tracing::info!(
        space_id = %membership.space_id(),
        user_id = %membership.user_id(),
        connection_id = %membership.key().connection_id,
        "session joined"
    );

    let mut writer = tokio::spawn(write_outbound(ws_tx, outbound));

    let reason = tokio::select! {
        reason = read_inbound(&membership, ws_rx, state.config.idle_timeout) => reason,
        _ = &mut writer => "transport closed",
    };

    tracing::info!(
        space_id = %membership.space_id(),
        user_id = %membership.user_id(),
        %reason,
        "session closed"
    );

    // Leaving closes the outbound queue; the writer then flushes and sends
    // a close frame on its own.
    drop(membership);
}

/// Read client frames until the connection ends. Returns why it ended.
async fn read_inbound(
    membership: &Membership,
    mut ws_rx: SplitStream<WebSocket>,
    idle_timeout: Option<Duration>,
) -> &'static str {
    loop {
        let next = match idle_timeout {
            Some(limit) => match time::timeout(limit, ws_rx.next()).await {
                Ok(next) => next,
                Err(_) => return "idle timeout",
            },
            None => ws_rx.next().await,
        };

        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return "client closed",
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(?e, user_id = %membership.user_id(), "ws read error");
                return "read error";
            }
        };

        let client_msg: ClientMessage = match serde_json::from_str(text.as_str()) {
            Ok(m) => m,
            Err(_) => return "malformed frame",
        };

        let kind = client_msg.kind.clone();
        match client_msg.into_event(membership.space_id()) {
            Some(event) if event.kind == EventType::PomodoroStatus => membership.publish(event),
            _ => tracing::trace!(%kind, "ignoring inbound message"),
        }
    }
}

/// Forward queued frames to the socket. Ends when the hub drops the queue's
/// sender or the socket stops accepting writes.
async fn write_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Arc<str>>,
) {
    while let Some(frame) = outbound.recv().await {
        if ws_tx.send(Message::Text(frame.to_string().into())).await.is_err() {
            return;
        }
    }
    let _ = send_close(&mut ws_tx, CLOSE_NORMAL, "connection closed").await;
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
