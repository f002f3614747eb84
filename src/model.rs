use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery status of a message. The integer repr is what lands in SQLite,
/// so "advance only" is a plain `status < ?` comparison there.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i32)]
pub enum MessageStatus {
    Sent = 0,
    Delivered = 1,
    Read = 2,
}

impl MessageStatus {
    /// True if moving from `self` to `next` advances the state machine.
    /// Backward and duplicate transitions are no-ops, never errors.
    pub fn advances_to(self, next: MessageStatus) -> bool {
        next > self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub email: String,
    pub username: String,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    #[serde(rename = "message_id")]
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    pub is_bot_response: bool,
}

impl Message {
    /// The other party of the pair, from `viewer`'s side.
    pub fn contact_for(&self, viewer: &str) -> &str {
        if self.sender == viewer {
            &self.recipient
        } else {
            &self.sender
        }
    }
}

/// One row of the chat list: per-contact aggregate shown in the UI.
/// Derived state; the message store is the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatListItem {
    pub contact_email: String,
    pub contact_name: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub unread_count: i64,
    pub is_bot: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_advances_forward() {
        use MessageStatus::*;
        assert!(Sent.advances_to(Delivered));
        assert!(Sent.advances_to(Read));
        assert!(Delivered.advances_to(Read));

        assert!(!Delivered.advances_to(Sent));
        assert!(!Read.advances_to(Delivered));
        assert!(!Read.advances_to(Read));
        assert!(!Sent.advances_to(Sent));
    }

    #[test]
    fn status_serializes_as_display_name() {
        assert_eq!(
            serde_json::to_string(&MessageStatus::Delivered).unwrap(),
            "\"Delivered\""
        );
        let parsed: MessageStatus = serde_json::from_str("\"Read\"").unwrap();
        assert_eq!(parsed, MessageStatus::Read);
    }
}
