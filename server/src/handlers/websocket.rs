//! WebSocket handler for the live feed.
//!
//! Observers connect read-only: they receive every session event broadcast
//! by the HTTP handlers and may ask for the current counters.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::websocket::{ClientMessage, ServerMessage};
use crate::AppState;

/// Handle an established WebSocket connection.
///
/// Registers the connection, forwards queued messages to the socket from a
/// spawned task, answers client requests until the socket closes, then
/// unregisters.
pub async fn handle_websocket_connection(socket: WebSocket, state: AppState, viewer: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn_manager = state.conn_manager.clone();

    let conn_id = conn_manager.register(viewer.clone(), tx);

    tracing::info!(conn_id = %conn_id, viewer = %viewer, "Live feed client connected");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    // Greet with the current state so late joiners catch up
    conn_manager.send_to(&conn_id, stats_message(&state, None).await);

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let response = process_message(text.as_str(), &state).await;
                conn_manager.send_to(&conn_id, response);
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        viewer = %viewer,
        active_connections = conn_manager.connection_count(),
        "Live feed client disconnected"
    );
}

/// Process a client message and return a server response.
async fn process_message(text: &str, state: &AppState) -> ServerMessage {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return ServerMessage::error(format!("Invalid message format: {}", e), None);
        }
    };

    match client_msg {
        ClientMessage::Stats { request_id } => stats_message(state, request_id).await,
        ClientMessage::Ping => ServerMessage::Pong,
    }
}

async fn stats_message(state: &AppState, request_id: Option<String>) -> ServerMessage {
    let session = state.session.read().await;
    ServerMessage::Stats {
        phase: session.phase(),
        stats: session.reconciler().map(|r| r.stats()),
        request_id,
    }
}
