//! Built-in assistant contact. It has no connection: messages addressed to
//! it are acknowledged instantly and answered with an intent-matched reply.

use chrono::Utc;
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::model::{Message, MessageStatus};
use crate::presence::Presence;
use crate::protocol::{ServerEvent, WireError};
use crate::{status, store};

pub const ASSISTANT_EMAIL: &str = "assistant@whisperwire.local";
pub const ASSISTANT_NAME: &str = "Whisperwire Assistant";

struct Intent {
    keywords: &'static [&'static str],
    responses: &'static [&'static str],
}

const INTENTS: &[Intent] = &[
    Intent {
        keywords: &["hi", "hello", "hey", "good morning", "good evening"],
        responses: &[
            "Hello! I'm the Whisperwire assistant. How can I help you today?",
            "Hi there! What can I do for you?",
            "Hey! How may I assist you?",
        ],
    },
    Intent {
        keywords: &["bye", "goodbye", "see you", "take care"],
        responses: &[
            "Goodbye! Feel free to reach out anytime.",
            "See you later! Have a great day.",
        ],
    },
    Intent {
        keywords: &["help", "support", "what can you do"],
        responses: &[
            "I can chat with you right here, any time. Just send me a message \
             and I'll answer immediately.",
        ],
    },
    Intent {
        keywords: &["thanks", "thank you", "appreciate"],
        responses: &["You're welcome!", "Happy to help!"],
    },
];

const FALLBACKS: &[&str] = &[
    "Interesting! Tell me more.",
    "I'm not sure I follow, but I'm listening.",
    "Could you rephrase that?",
];

fn reply_to(content: &str) -> String {
    let lowered = content.to_lowercase();
    let responses = INTENTS
        .iter()
        .find(|intent| intent.keywords.iter().any(|k| lowered.contains(k)))
        .map(|intent| intent.responses)
        .unwrap_or(FALLBACKS);
    (*responses.choose(&mut rand::rng()).unwrap_or(&responses[0])).to_owned()
}

/// Handle a message addressed to the assistant: acknowledge delivery and
/// read to the sender, then push the reply back as a fresh message.
pub async fn receive(
    db_pool: &SqlitePool,
    presence: &Presence,
    incoming: &Message,
) -> Result<(), WireError> {
    status::mark_delivered(db_pool, presence, &incoming.id).await?;
    status::mark_read(db_pool, presence, &incoming.id, ASSISTANT_EMAIL).await?;

    let reply = Message {
        id: Uuid::now_v7().to_string(),
        sender: ASSISTANT_EMAIL.to_owned(),
        recipient: incoming.sender.clone(),
        content: reply_to(&incoming.content),
        timestamp: Utc::now(),
        status: MessageStatus::Sent,
        is_bot_response: true,
    };
    store::insert_message(db_pool, &reply).await?;
    info!(message_id = %reply.id, recipient = %reply.recipient, "assistant replied");

    if presence.is_online(&reply.recipient) {
        presence.send(
            &reply.recipient,
            ServerEvent::NewMessage {
                message: reply.clone(),
            },
        );
        status::mark_delivered(db_pool, presence, &reply.id).await?;
    }
    Ok(())
}

/// Make sure the assistant's user row exists. Called once at startup.
pub async fn ensure_user(db_pool: &SqlitePool) -> sqlx::Result<()> {
    store::ensure_user(db_pool, ASSISTANT_EMAIL, ASSISTANT_NAME, true).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_matches_greeting_intent() {
        let reply = reply_to("Hello there");
        assert!(INTENTS[0].responses.contains(&reply.as_str()));
    }

    #[test]
    fn unknown_input_falls_back() {
        let reply = reply_to("qwertyuiop");
        assert!(FALLBACKS.contains(&reply.as_str()));
    }
}
