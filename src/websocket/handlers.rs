use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::middleware::auth::verify_token;
use crate::services::delivery::DeliveryService;
use crate::state::AppState;
use crate::websocket::events::{ClientEvent, ServerEvent};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

fn bearer_token(params: &WsParams, headers: &HeaderMap) -> Option<String> {
    params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    })
}

/// Push-channel handshake: the credential is resolved before the upgrade,
/// so an unauthenticated peer never holds a connection.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let participant_id = match bearer_token(&params, &headers)
        .and_then(|token| verify_token(&token, &state.config.jwt_secret).ok())
    {
        Some(id) => id,
        None => return StatusCode::UNAUTHORIZED.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(state, participant_id, socket))
        .into_response()
}

async fn handle_socket(state: AppState, participant_id: Uuid, socket: WebSocket) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ServerEvent>();
    let connection_id = state.registry.register(participant_id, tx);
    debug!(%participant_id, "push channel open");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            maybe = rx.recv() => {
                match maybe {
                    Some(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(e) => {
                                warn!(error = %e, "dropping unserializable event");
                                continue;
                            }
                        };
                        if sink.send(WsMessage::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    // Sender side dropped: a newer connection replaced this one.
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_client_event(&state, participant_id, &text).await;
                    }
                    Some(Ok(WsMessage::Ping(_)))
                    | Some(Ok(WsMessage::Pong(_)))
                    | Some(Ok(WsMessage::Binary(_))) => {}
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                }
            }
        }
    }

    state.registry.unregister(participant_id, connection_id);
    debug!(%participant_id, "push channel closed");
}

async fn handle_client_event(state: &AppState, sender_id: Uuid, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(_) => {
            state.registry.push(
                sender_id,
                ServerEvent::Error {
                    message: "unrecognized event".into(),
                },
            );
            return;
        }
    };

    match event {
        ClientEvent::SendMessage {
            receiver_id,
            content,
            kind,
            client_ref,
        } => {
            match DeliveryService::send(state, sender_id, receiver_id, content, kind).await {
                Ok(message) => {
                    state.registry.push(
                        sender_id,
                        ServerEvent::MessageSent {
                            message_id: message.id,
                            conversation_id: message.conversation_id,
                            created_at: message.created_at,
                            client_ref,
                        },
                    );
                }
                Err(err) => {
                    state.registry.push(
                        sender_id,
                        ServerEvent::Error {
                            message: err.user_message(),
                        },
                    );
                }
            }
        }
        ClientEvent::Typing { receiver_id } => {
            DeliveryService::typing(state, sender_id, receiver_id, true);
        }
        ClientEvent::StopTyping { receiver_id } => {
            DeliveryService::typing(state, sender_id, receiver_id, false);
        }
    }
}
