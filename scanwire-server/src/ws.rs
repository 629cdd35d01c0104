//! Observer WebSocket channel.
//!
//! Each upgraded socket becomes one observer connection:
//!
//! ```text
//! reader loop  <- attach/detach/ping        (client messages)
//! writer task  -> snapshot, events, notices (hub send queue)
//! monitor task -> liveness check, reaps the connection on timeout
//! ```
//!
//! Closing the socket is an implicit detach from every session plus
//! liveness cleanup -- the hub's disconnect path covers both.

use std::time::{Duration, SystemTime};

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;

use scanwire_core::wire::{ClientMessage, ServerNotice};
use scanwire_event_hub::spawn_connection_monitor;

use crate::state::AppState;

/// `GET /ws` -- upgrade to the observer channel.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (connection, mut out_rx) = state.hub.register_observer().await;
    let conn_id = connection.id.clone();
    tracing::info!(conn_id = %conn_id, "websocket observer connected");

    // Writer: drain the hub send queue into the socket.
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if ws_tx
                .send(Message::Text(message.as_str().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Liveness monitor on its own timer, decoupled from event flow.
    let cancel = CancellationToken::new();
    let monitor = spawn_connection_monitor(
        state.hub.clone(),
        connection.clone(),
        Duration::from_secs(state.config.heartbeat.interval_secs),
        Duration::from_secs(state.config.heartbeat.timeout_secs),
        cancel.clone(),
    );

    // Reader: client messages until close or error.
    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => {
                connection.mark_alive();
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Attach { session_id }) => {
                        if let Err(e) = state.hub.attach(&session_id, &connection).await {
                            tracing::warn!(
                                conn_id = %connection.id,
                                %session_id,
                                error = %e,
                                "attach failed"
                            );
                            let _ = connection.send_json(&ServerNotice::Error {
                                error: e.to_string(),
                                session_id: Some(session_id),
                            });
                        }
                    }
                    Ok(ClientMessage::Detach { session_id }) => {
                        state.hub.detach(&session_id, &connection).await;
                    }
                    Ok(ClientMessage::Ping) => {
                        let _ = connection.send_json(&ServerNotice::Pong {
                            timestamp: SystemTime::now(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            conn_id = %connection.id,
                            error = %e,
                            "malformed client message dropped"
                        );
                    }
                }
            }
            // axum answers pings automatically; both directions count as liveness
            Message::Ping(_) | Message::Pong(_) => connection.mark_alive(),
            Message::Close(_) => break,
            Message::Binary(_) => {
                tracing::debug!(conn_id = %connection.id, "binary frame ignored");
            }
        }
    }

    // Implicit detach-everywhere + cleanup.
    cancel.cancel();
    let _ = monitor.await;
    state.hub.disconnect(&conn_id).await;
    writer.abort();
    tracing::info!(conn_id = %conn_id, "websocket observer closed");
}
