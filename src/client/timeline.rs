//! Reconciliation of pulled history and pushed events into one ordered,
//! duplicate-free message list.

use std::collections::HashSet;

use crate::model::{Message, MessageStatus};

/// An ordered, deduplicated message sequence. History batches and live
/// pushes go through the same `merge`, so overlap between the two sources
/// cannot double-insert or reorder anything.
#[derive(Debug, Default)]
pub struct Timeline {
    messages: Vec<Message>,
    seen: HashSet<String>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message at its timestamp position. Dedup key is the
    /// server-assigned id; a message already present is ignored no matter
    /// which source produced it. Returns whether anything changed.
    pub fn merge(&mut self, incoming: Message) -> bool {
        if !self.seen.insert(incoming.id.clone()) {
            return false;
        }
        let at = self
            .messages
            .partition_point(|m| m.timestamp <= incoming.timestamp);
        self.messages.insert(at, incoming);
        true
    }

    pub fn extend(&mut self, batch: impl IntoIterator<Item = Message>) {
        for message in batch {
            self.merge(message);
        }
    }

    /// Advance a local copy's status from an acknowledgement event. Backward
    /// or unknown-id updates are ignored.
    pub fn apply_status(&mut self, id: &str, status: MessageStatus) -> bool {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            if message.status.advances_to(status) {
                message.status = status;
                return true;
            }
        }
        false
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Ties an in-flight history fetch to the selection that started it.
#[derive(Debug)]
pub struct FetchTicket {
    epoch: u64,
}

/// The message view for the currently selected contact. Switching contacts
/// bumps an epoch: events and fetch results scoped to the old selection are
/// discarded instead of bleeding into the new one.
#[derive(Debug, Default)]
pub struct ActiveConversation {
    contact: Option<String>,
    epoch: u64,
    timeline: Timeline,
}

impl ActiveConversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `contact` the active selection, dropping all prior state, and
    /// hand back the ticket the history fetch must present on completion.
    pub fn select(&mut self, contact: &str) -> FetchTicket {
        self.epoch += 1;
        self.contact = Some(contact.to_owned());
        self.timeline = Timeline::new();
        FetchTicket { epoch: self.epoch }
    }

    /// Merge a completed history fetch, unless the selection moved on while
    /// it was in flight; a stale batch is discarded wholesale.
    pub fn complete_fetch(&mut self, ticket: &FetchTicket, batch: Vec<Message>) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        self.timeline.extend(batch);
        true
    }

    /// Merge a live push if it belongs to the active conversation as seen by
    /// `viewer`. Messages for other contacts are not this view's concern.
    pub fn push(&mut self, viewer: &str, message: Message) -> bool {
        match &self.contact {
            Some(contact) if message.contact_for(viewer) == contact => {
                self.timeline.merge(message)
            }
            _ => false,
        }
    }

    pub fn apply_status(&mut self, id: &str, status: MessageStatus) -> bool {
        self.timeline.apply_status(id, status)
    }

    pub fn contact(&self) -> Option<&str> {
        self.contact.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        self.timeline.messages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn msg(id: &str, sender: &str, recipient: &str, seconds: i64) -> Message {
        Message {
            id: id.to_owned(),
            sender: sender.to_owned(),
            recipient: recipient.to_owned(),
            content: format!("content of {id}"),
            timestamp: Utc::now() + Duration::seconds(seconds),
            status: MessageStatus::Sent,
            is_bot_response: false,
        }
    }

    fn ids(timeline: &Timeline) -> Vec<&str> {
        timeline.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn merge_keeps_timestamp_order() {
        let mut timeline = Timeline::new();
        timeline.merge(msg("m2", "a", "b", 2));
        timeline.merge(msg("m1", "a", "b", 1));
        timeline.merge(msg("m3", "b", "a", 3));
        assert_eq!(ids(&timeline), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn duplicate_id_is_ignored_regardless_of_source() {
        let mut timeline = Timeline::new();
        // History batch first, then the same message redelivered by push.
        timeline.extend([msg("m1", "a", "b", 1), msg("m2", "a", "b", 2)]);
        assert!(!timeline.merge(msg("m1", "a", "b", 1)));
        assert_eq!(timeline.len(), 2);
        assert_eq!(ids(&timeline), vec!["m1", "m2"]);
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let mut timeline = Timeline::new();
        let mut first = msg("m1", "a", "b", 0);
        let mut second = msg("m2", "a", "b", 0);
        second.timestamp = first.timestamp;
        first.content = "first".into();
        second.content = "second".into();
        timeline.merge(first);
        timeline.merge(second);
        assert_eq!(ids(&timeline), vec!["m1", "m2"]);
    }

    #[test]
    fn status_updates_only_advance() {
        let mut timeline = Timeline::new();
        timeline.merge(msg("m1", "a", "b", 1));
        assert!(timeline.apply_status("m1", MessageStatus::Read));
        assert!(!timeline.apply_status("m1", MessageStatus::Delivered));
        assert!(!timeline.apply_status("gone", MessageStatus::Read));
        assert_eq!(timeline.messages()[0].status, MessageStatus::Read);
    }

    #[test]
    fn contact_switch_discards_late_fetch() {
        let mut view = ActiveConversation::new();
        let stale = view.select("b@x.io");
        let fresh = view.select("c@x.io");

        // The fetch for b@x.io lands after the switch: dropped wholesale.
        assert!(!view.complete_fetch(&stale, vec![msg("m1", "b@x.io", "a@x.io", 1)]));
        assert!(view.messages().is_empty());

        assert!(view.complete_fetch(&fresh, vec![msg("m2", "c@x.io", "a@x.io", 2)]));
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn pushes_for_other_contacts_are_ignored() {
        let mut view = ActiveConversation::new();
        view.select("b@x.io");
        assert!(view.push("a@x.io", msg("m1", "b@x.io", "a@x.io", 1)));
        assert!(view.push("a@x.io", msg("m2", "a@x.io", "b@x.io", 2)));
        assert!(!view.push("a@x.io", msg("m3", "c@x.io", "a@x.io", 3)));
        assert_eq!(view.messages().len(), 2);
    }

    #[test]
    fn overlapping_fetch_and_push_never_duplicate() {
        let mut view = ActiveConversation::new();
        let ticket = view.select("b@x.io");
        let shared = msg("m1", "b@x.io", "a@x.io", 1);

        // Push arrives while the fetch, which also contains m1, is in flight.
        assert!(view.push("a@x.io", shared.clone()));
        assert!(view.complete_fetch(&ticket, vec![shared, msg("m0", "b@x.io", "a@x.io", 0)]));
        let ids: Vec<_> = view.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1"]);
    }
}
