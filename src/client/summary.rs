//! Per-contact conversation summaries: last message, unread count, recency
//! order. Derived state, recomputed incrementally from the event stream.

use crate::assistant;
use crate::model::{ChatListItem, Message, MessageStatus};

/// The chat list as one viewing user sees it. Seeded from the REST chat
/// list at cold start, then kept current by `apply`ing every message event.
#[derive(Debug)]
pub struct SummaryBoard {
    viewer: String,
    entries: Vec<ChatListItem>,
}

impl SummaryBoard {
    pub fn new(viewer: &str) -> Self {
        Self {
            viewer: viewer.to_owned(),
            entries: Vec::new(),
        }
    }

    /// Replace all entries with an authoritative cold-start snapshot.
    pub fn seed(&mut self, items: Vec<ChatListItem>) {
        self.entries = items;
        self.sort();
    }

    /// Fold one message event (sent or received) into the summaries.
    ///
    /// The unread counter moves only for messages *received* by the viewer
    /// that are not yet Read; the viewer's own messages never count.
    pub fn apply(&mut self, message: &Message) {
        let contact = message.contact_for(&self.viewer).to_owned();
        let at = match self.entries.iter().position(|e| e.contact_email == contact) {
            Some(at) => at,
            None => {
                // First contact with this party; the display name catches up
                // when the next chat-list fetch seeds real user data. The bot
                // flag is a property of the contact, so it is decided here by
                // identity rather than by which way the first message went.
                let is_bot = contact == assistant::ASSISTANT_EMAIL;
                self.entries.push(ChatListItem {
                    contact_email: contact.clone(),
                    contact_name: contact,
                    last_message: None,
                    last_message_time: None,
                    unread_count: 0,
                    is_bot,
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[at];

        if entry.last_message_time.is_none_or(|t| message.timestamp >= t) {
            entry.last_message = Some(message.content.clone());
            entry.last_message_time = Some(message.timestamp);
        }
        if message.recipient == self.viewer && message.status != MessageStatus::Read {
            entry.unread_count += 1;
        }
        self.sort();
    }

    /// Local UI action: opening a conversation zeroes its unread counter
    /// immediately, independent of any server acknowledgement.
    pub fn open(&mut self, contact: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.contact_email == contact) {
            entry.unread_count = 0;
        }
    }

    /// Summaries in display order: newest last message first, contacts with
    /// no messages yet last.
    pub fn entries(&self) -> &[ChatListItem] {
        &self.entries
    }

    fn sort(&mut self) {
        // Option<DateTime> orders None first, so descending puts it last.
        self.entries
            .sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
    }
}
