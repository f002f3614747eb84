//! The send path: validate, persist, echo, route.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::assistant;
use crate::model::{Message, MessageStatus};
use crate::presence::Presence;
use crate::protocol::{ServerEvent, WireError};
use crate::{status, store};

/// Accept a message from an authenticated sender and move it as far through
/// the pipeline as the recipient's presence allows.
///
/// The sender identity comes from the connection, never from the payload.
/// On a storage failure nothing is broadcast to either party. An offline
/// recipient leaves the message at Sent; the history fetch advances it later.
pub async fn submit(
    db_pool: &SqlitePool,
    presence: &Presence,
    sender: &str,
    recipient: &str,
    content: &str,
) -> Result<Message, WireError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(WireError::InvalidContent);
    }
    if store::fetch_user(db_pool, recipient).await?.is_none() {
        return Err(WireError::InvalidRecipient(recipient.to_owned()));
    }

    let message = Message {
        id: Uuid::now_v7().to_string(),
        sender: sender.to_owned(),
        recipient: recipient.to_owned(),
        content: content.to_owned(),
        timestamp: Utc::now(),
        status: MessageStatus::Sent,
        is_bot_response: false,
    };
    store::insert_message(db_pool, &message).await?;
    info!(message_id = %message.id, sender, recipient, "message accepted");

    // Echo carries the authoritative id and timestamp so the sender can
    // reconcile its optimistic local copy.
    presence.send(
        sender,
        ServerEvent::MessageSent {
            message: message.clone(),
        },
    );

    if recipient == assistant::ASSISTANT_EMAIL {
        assistant::receive(db_pool, presence, &message).await?;
    } else if presence.is_online(recipient) {
        presence.send(
            recipient,
            ServerEvent::NewMessage {
                message: message.clone(),
            },
        );
        status::mark_delivered(db_pool, presence, &message.id).await?;
    }

    Ok(message)
}
