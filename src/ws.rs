use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::commands::{self, CommandContext};
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::session::ChannelSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user: String,
    /// Present for group chat connections, absent for private ones
    pub group: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: user={}, group={:?}",
        params.user,
        params.group
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Serialize and send one frame. Returns `false` once the socket is gone.
async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Each socket becomes one session: engine output arrives on `outbox`
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let channel_id = match &params.group {
        Some(group) => format!("group:{}:{}", group, ulid::Ulid::new()),
        None => format!("dm:{}:{}", params.user, ulid::Ulid::new()),
    };
    let (session, mut outbox) = ChannelSession::pair(channel_id.clone());
    let ctx = CommandContext {
        user_id: params.user.clone(),
        group_id: params.group.clone(),
        session,
    };

    tracing::info!("WebSocket connected: {}", channel_id);

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        user: params.user.clone(),
        group: params.group.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_message(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            // Messages the game sent to this channel
            text = outbox.recv() => {
                let Some(text) = text else { break };
                if !send_message(&mut sender, &ServerMessage::Say { text }).await {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                match commands::dispatch(&state, &ctx, client_msg.into()).await {
                                    Ok(Some(text)) => Some(ServerMessage::Reply { text }),
                                    Ok(None) => None,
                                    Err(e) => Some(ServerMessage::Error {
                                        code: e.code().to_string(),
                                        msg: e.to_string(),
                                    }),
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if !send_message(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
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

    tracing::info!("WebSocket connection closed: {}", channel_id);
}
