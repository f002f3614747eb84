use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Message, MessageStatus};

/// Events a client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage {
        recipient: String,
        content: String,
    },
    MarkAsRead {
        message_id: String,
    },
    Typing {
        recipient: String,
        #[serde(default = "default_true")]
        is_typing: bool,
    },
    GetOnlineStatus {
        email: String,
    },
}

fn default_true() -> bool {
    true
}

/// Events the server pushes to a connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        email: String,
    },
    NewMessage {
        message: Message,
    },
    MessageSent {
        message: Message,
    },
    MessageDelivered {
        message_id: String,
        status: MessageStatus,
    },
    MessageRead {
        message_id: String,
        status: MessageStatus,
        read_by: String,
    },
    UserTyping {
        sender: String,
        is_typing: bool,
    },
    OnlineStatus {
        email: String,
        is_online: bool,
    },
    Error {
        message: String,
    },
}

/// Failures of the wire protocol and delivery pipeline. Everything here is
/// reported back to the originating connection as an `error` event; races
/// (stale status, duplicate ids) are handled as no-ops and never reach this.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("unknown recipient: {0}")]
    InvalidRecipient(String),
    #[error("message content must not be empty")]
    InvalidContent,
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage failure: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("malformed event payload: {0}")]
    Protocol(String),
}

impl WireError {
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error {
            message: self.to_string(),
        }
    }
}
