//! Live push channel: WebSocket observers.
//!
//! Observers connect at `/ws/metrics`, optionally scoped with `?appId=N`.
//! The hub owns the connection indexes; this handler only pumps queued
//! events into the socket and answers text-level pings.

use axum::{
    extract::{
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    pub app_id: Option<u64>,
}

/// Handler for `GET /ws/metrics[?appId=N]`.
#[instrument(skip(state, ws))]
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    state.stats.record_http_request();
    ws.on_upgrade(move |socket| observer_session(state, socket, query.app_id))
}

async fn observer_session(state: SharedState, socket: WebSocket, app_id: Option<u64>) {
    let (conn_id, mut events) = state.hub.connect(app_id);
    state
        .metrics
        .observer_connections
        .set(state.hub.connection_count() as f64);

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(json) => {
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                // Sender side dropped: the hub removed this connection
                // after a failed delivery.
                None => break,
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    debug!("Received message from connection {}: {}", conn_id, text.as_str());
                    if text.as_str() == "ping"
                        && sink
                            .send(Message::Text(Utf8Bytes::from_static("pong")))
                            .await
                            .is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.hub.disconnect(conn_id);
    state
        .metrics
        .observer_connections
        .set(state.hub.connection_count() as f64);
}
