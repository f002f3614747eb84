//! Ephemeral typing indicators. Nothing here is persisted and nothing is
//! retried; a missed indicator simply never shows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::presence::Presence;
use crate::protocol::ServerEvent;

/// Window after which an unrenewed indicator clears itself.
pub const TYPING_WINDOW: Duration = Duration::from_secs(3);

type PairKey = (String, String);

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Pending expiry timers, keyed by (sender, recipient). Process-wide, shared
/// across connection tasks. Timers are generation-tagged so an expiry body
/// that lost the race against a renewal cannot clear the renewed timer.
#[derive(Clone, Default)]
pub struct TypingTimers {
    inner: Arc<Mutex<HashMap<PairKey, Timer>>>,
    next_generation: Arc<Mutex<u64>>,
}

impl TypingTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast a typing change from `sender` to `recipient`. `true` pushes
    /// the indicator and arms (or re-arms) the expiry timer; `false` cancels
    /// the timer and pushes cleared state immediately.
    pub fn set_typing(&self, presence: &Presence, sender: &str, recipient: &str, is_typing: bool) {
        let key = (sender.to_owned(), recipient.to_owned());

        if let Some(timer) = self.inner.lock().unwrap().remove(&key) {
            timer.handle.abort();
        }

        presence.send(
            recipient,
            ServerEvent::UserTyping {
                sender: sender.to_owned(),
                is_typing,
            },
        );

        if !is_typing {
            return;
        }

        let generation = {
            let mut next = self.next_generation.lock().unwrap();
            *next += 1;
            *next
        };
        let timers = self.inner.clone();
        let presence = presence.clone();
        let expiry_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(TYPING_WINDOW).await;
            let owned = {
                let mut timers = timers.lock().unwrap();
                match timers.get(&expiry_key) {
                    Some(t) if t.generation == generation => {
                        timers.remove(&expiry_key);
                        true
                    }
                    _ => false,
                }
            };
            if owned {
                presence.send(
                    &expiry_key.1,
                    ServerEvent::UserTyping {
                        sender: expiry_key.0,
                        is_typing: false,
                    },
                );
            }
        });
        self.inner
            .lock()
            .unwrap()
            .insert(key, Timer { generation, handle });
    }

    /// Cancel every pending indicator owned by `sender`. Called on connection
    /// teardown; a reconnect starts from a clean slate.
    pub fn clear_sender(&self, sender: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.retain(|(s, _), timer| {
            if s == sender {
                timer.handle.abort();
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn online(presence: &Presence, email: &str) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        presence.register(email, tx);
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn indicator_expires_without_renewal() {
        let presence = Presence::new();
        let typing = TypingTimers::new();
        let mut rx = online(&presence, "b@x.io");

        typing.set_typing(&presence, "a@x.io", "b@x.io", true);
        assert!(matches!(
            rx.recv().await,
            Some(ServerEvent::UserTyping { is_typing: true, .. })
        ));

        tokio::time::advance(TYPING_WINDOW + Duration::from_millis(10)).await;
        assert!(matches!(
            rx.recv().await,
            Some(ServerEvent::UserTyping { is_typing: false, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn renewal_rearms_the_window() {
        let presence = Presence::new();
        let typing = TypingTimers::new();
        let mut rx = online(&presence, "b@x.io");

        typing.set_typing(&presence, "a@x.io", "b@x.io", true);
        rx.recv().await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        typing.set_typing(&presence, "a@x.io", "b@x.io", true);
        rx.recv().await.unwrap();

        // The original window has passed but the renewal keeps it alive.
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(matches!(
            rx.recv().await,
            Some(ServerEvent::UserTyping { is_typing: false, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_typing_clears_immediately_and_cancels_timer() {
        let presence = Presence::new();
        let typing = TypingTimers::new();
        let mut rx = online(&presence, "b@x.io");

        typing.set_typing(&presence, "a@x.io", "b@x.io", true);
        rx.recv().await.unwrap();
        typing.set_typing(&presence, "a@x.io", "b@x.io", false);
        assert!(matches!(
            rx.recv().await,
            Some(ServerEvent::UserTyping { is_typing: false, .. })
        ));

        tokio::time::advance(TYPING_WINDOW * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_timers() {
        let presence = Presence::new();
        let typing = TypingTimers::new();
        let mut rx = online(&presence, "b@x.io");

        typing.set_typing(&presence, "a@x.io", "b@x.io", true);
        rx.recv().await.unwrap();
        typing.clear_sender("a@x.io");

        tokio::time::advance(TYPING_WINDOW * 2).await;
        assert!(rx.try_recv().is_err());
    }
}
