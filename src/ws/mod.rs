pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt, Sink};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: role={:?}", params.role);

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Serialize and send; false once the peer is gone
async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", msg, e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let role = match params.role.as_deref() {
        Some("host") => Role::Host,
        _ => Role::Player,
    };

    tracing::info!("WebSocket connected with role: {:?}", role);

    // Subscribe before taking the snapshot so no commit falls in between
    let mut broadcast_rx = state.broadcast.subscribe();
    let mut host_broadcast_rx = if role == Role::Host {
        Some(state.host_broadcast.subscribe())
    } else {
        None
    };

    let welcome = ServerMessage::StateUpdate(state.client_snapshot().await);
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send initial snapshot");
        return;
    }

    // Handle incoming messages and broadcasts
    loop {
        tokio::select! {
            // Handle general broadcasts (all clients)
            broadcast_msg = broadcast_rx.recv() => {
                match broadcast_msg {
                    Ok(msg) => {
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // The next snapshot supersedes the skipped ones
                        tracing::warn!("Client lagged, skipped {} messages", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // Handle Host-specific broadcasts
            host_msg = async {
                match &mut host_broadcast_rx {
                    Some(rx) => rx.recv().await.ok(),
                    None => {
                        // Non-Host: wait forever
                        std::future::pending::<Option<ServerMessage>>().await
                    }
                }
            } => {
                if let Some(msg) = host_msg {
                    if !send_json(&mut sender, &msg).await {
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &role, &state).await
                                {
                                    if !send_json(&mut sender, &response).await {
                                        tracing::error!("Failed to send response");
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                // One bad message must not take the connection down
                                tracing::warn!("Failed to parse client message: {}", e);
                                if role == Role::Host {
                                    let error = ServerMessage::Error {
                                        code: "PARSE_ERROR".to_string(),
                                        msg: format!("Invalid message format: {}", e),
                                    };
                                    let _ = send_json(&mut sender, &error).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Players stay in the session until a rejoin or an explicit kick
    tracing::info!("WebSocket connection closed for role: {:?}", role);
}
