//! Online-presence registry: one live binding per user, process-wide.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::protocol::ServerEvent;

/// Outbound half of a connection: events queued here are forwarded to the
/// user's socket by that connection's writer task.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Clone, Default)]
pub struct Presence {
    inner: Arc<Mutex<HashMap<String, Binding>>>,
}

struct Binding {
    generation: u64,
    tx: EventSender,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `email` to a connection, evicting any stale prior binding
    /// (re-registering is a reconnect, not an error). Returns a generation
    /// token the connection must present at unregister time.
    pub fn register(&self, email: &str, tx: EventSender) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let generation = inner.get(email).map_or(0, |b| b.generation + 1);
        inner.insert(email.to_owned(), Binding { generation, tx });
        generation
    }

    /// Remove the binding, but only if it still belongs to the caller's
    /// generation. A slow teardown of a replaced connection must not evict
    /// the connection that replaced it.
    pub fn unregister(&self, email: &str, generation: u64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(email) {
            Some(b) if b.generation == generation => {
                inner.remove(email);
                true
            }
            _ => false,
        }
    }

    pub fn is_online(&self, email: &str) -> bool {
        self.inner.lock().unwrap().contains_key(email)
    }

    pub fn lookup(&self, email: &str) -> Option<EventSender> {
        self.inner.lock().unwrap().get(email).map(|b| b.tx.clone())
    }

    /// Best-effort push to a user's connection. Returns false if the user is
    /// offline or the connection is already gone.
    pub fn send(&self, email: &str, event: ServerEvent) -> bool {
        match self.lookup(email) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}
