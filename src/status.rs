//! Sent → Delivered → Read transitions. Each call is one atomic
//! compare-and-swap in the store; duplicates, regressions, and unknown ids
//! fall out as no-ops so flaky acknowledgements cannot corrupt state.

use sqlx::SqlitePool;
use tracing::debug;

use crate::model::MessageStatus;
use crate::presence::Presence;
use crate::protocol::{ServerEvent, WireError};
use crate::store;

/// Advance a message to Delivered and notify its sender. The recipient's own
/// copy is already current, so only the sender is pushed to.
pub async fn mark_delivered(
    db_pool: &SqlitePool,
    presence: &Presence,
    message_id: &str,
) -> Result<bool, WireError> {
    let advanced =
        store::advance_status(db_pool, message_id, MessageStatus::Delivered, None).await?;
    if advanced {
        if let Some(message) = store::fetch_message(db_pool, message_id).await? {
            debug!(message_id, sender = %message.sender, "message delivered");
            presence.send(
                &message.sender,
                ServerEvent::MessageDelivered {
                    message_id: message_id.to_owned(),
                    status: MessageStatus::Delivered,
                },
            );
        }
    }
    Ok(advanced)
}

/// Advance a message to Read on the recipient's explicit acknowledgement.
/// Only the recipient may read; anyone else's attempt matches no row.
pub async fn mark_read(
    db_pool: &SqlitePool,
    presence: &Presence,
    message_id: &str,
    reader: &str,
) -> Result<bool, WireError> {
    let advanced =
        store::advance_status(db_pool, message_id, MessageStatus::Read, Some(reader)).await?;
    if advanced {
        if let Some(message) = store::fetch_message(db_pool, message_id).await? {
            debug!(message_id, reader, "message read");
            presence.send(
                &message.sender,
                ServerEvent::MessageRead {
                    message_id: message_id.to_owned(),
                    status: MessageStatus::Read,
                    read_by: reader.to_owned(),
                },
            );
        }
    }
    Ok(advanced)
}
