//! One task per live connection: authenticate, register presence, pump
//! events both ways, tear everything down on disconnect.

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use crate::protocol::{ClientEvent, ServerEvent, WireError};
use crate::{AppState, auth, delivery, status, store};

#[derive(Deserialize)]
pub struct ConnectQuery {
    token: Option<String>,
}

/// `GET /ws?token=<jwt>`. A missing or invalid token refuses the upgrade
/// before any presence state exists.
pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let verified = query
        .token
        .as_deref()
        .and_then(|token| auth::verify_token(token, &state.settings.secret_key).ok());
    let Some(email) = verified else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    ws.on_upgrade(move |socket| connection(state, email, socket))
}

async fn connection(state: AppState, email: String, socket: WebSocket) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let generation = state.presence.register(&email, tx.clone());
    info!(user = %email, "websocket connected");

    let _ = tx.send(ServerEvent::Connected {
        email: email.clone(),
    });
    broadcast_presence(&state, &email, true).await;

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(text.into()).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let data = match frame {
            WsMessage::Close(_) => break,
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => other.into_data(),
        };
        let event = match serde_json::from_slice::<ClientEvent>(&data) {
            Ok(event) => event,
            Err(err) => {
                let _ = tx.send(WireError::Protocol(err.to_string()).to_event());
                continue;
            }
        };
        // Each event is handled to completion before the next is read, which
        // is what keeps per-pair send order FIFO.
        if let Err(err) = dispatch(&state, &email, event).await {
            warn!(user = %email, error = %err, "client event failed");
            let _ = tx.send(err.to_event());
        }
    }

    writer.abort();
    state.typing.clear_sender(&email);
    if state.presence.unregister(&email, generation) {
        broadcast_presence(&state, &email, false).await;
    }
    info!(user = %email, "websocket disconnected");
}

async fn dispatch(state: &AppState, email: &str, event: ClientEvent) -> Result<(), WireError> {
    match event {
        ClientEvent::SendMessage { recipient, content } => {
            delivery::submit(&state.db_pool, &state.presence, email, &recipient, &content)
                .await?;
        }
        ClientEvent::MarkAsRead { message_id } => {
            status::mark_read(&state.db_pool, &state.presence, &message_id, email).await?;
        }
        ClientEvent::Typing {
            recipient,
            is_typing,
        } => {
            state
                .typing
                .set_typing(&state.presence, email, &recipient, is_typing);
        }
        ClientEvent::GetOnlineStatus { email: target } => {
            let is_online = state.presence.is_online(&target);
            state.presence.send(
                email,
                ServerEvent::OnlineStatus {
                    email: target,
                    is_online,
                },
            );
        }
    }
    Ok(())
}

/// Tell everyone who shares a conversation with `email` that their presence
/// changed. Best effort: offline observers simply miss it.
async fn broadcast_presence(state: &AppState, email: &str, is_online: bool) {
    let contacts = match store::contacts_of(&state.db_pool, email).await {
        Ok(contacts) => contacts,
        Err(err) => {
            warn!(user = %email, error = %err, "presence fan-out skipped");
            return;
        }
    };
    for contact in contacts {
        state.presence.send(
            &contact,
            ServerEvent::OnlineStatus {
                email: email.to_owned(),
                is_online,
            },
        );
    }
}
