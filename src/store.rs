//! SQLite persistence for users and messages. The engine owns no other
//! durable state; summaries and timelines are derived caches.

use sqlx::SqlitePool;

use crate::model::{ChatListItem, Message, MessageStatus, User};

pub async fn init(db_pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            email TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            is_bot BOOLEAN NOT NULL DEFAULT FALSE
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            sender TEXT NOT NULL,
            recipient TEXT NOT NULL,
            content TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            status INTEGER NOT NULL,
            is_bot_response BOOLEAN NOT NULL DEFAULT FALSE
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_recipient
         ON messages (recipient, sender, status)",
    )
    .execute(db_pool)
    .await?;

    Ok(())
}

/// Insert a user row if it does not exist yet. Registration proper lives
/// outside this crate; this covers seeding (e.g. the assistant) and tests.
pub async fn ensure_user(
    db_pool: &SqlitePool,
    email: &str,
    username: &str,
    is_bot: bool,
) -> sqlx::Result<()> {
    sqlx::query("INSERT OR IGNORE INTO users (email, username, is_bot) VALUES (?, ?, ?)")
        .bind(email)
        .bind(username)
        .bind(is_bot)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn fetch_user(db_pool: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as("SELECT email, username, is_bot FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db_pool)
        .await
}

pub async fn insert_message(db_pool: &SqlitePool, message: &Message) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO messages (id, sender, recipient, content, timestamp, status, is_bot_response)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&message.id)
    .bind(&message.sender)
    .bind(&message.recipient)
    .bind(&message.content)
    .bind(message.timestamp)
    .bind(message.status)
    .bind(message.is_bot_response)
    .execute(db_pool)
    .await?;
    Ok(())
}

pub async fn fetch_message(db_pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Message>> {
    sqlx::query_as("SELECT * FROM messages WHERE id = ?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

/// Compare-and-swap a message's status forward. Returns true only if the row
/// actually advanced; a backward, duplicate, or unknown-id update changes
/// nothing and reports false. When `required_recipient` is set the swap also
/// requires the caller to be the recipient (only the recipient reads).
pub async fn advance_status(
    db_pool: &SqlitePool,
    id: &str,
    next: MessageStatus,
    required_recipient: Option<&str>,
) -> sqlx::Result<bool> {
    let result = match required_recipient {
        Some(recipient) => {
            sqlx::query("UPDATE messages SET status = ?1 WHERE id = ?2 AND status < ?1 AND recipient = ?3")
                .bind(next)
                .bind(id)
                .bind(recipient)
                .execute(db_pool)
                .await?
        }
        None => {
            sqlx::query("UPDATE messages SET status = ?1 WHERE id = ?2 AND status < ?1")
                .bind(next)
                .bind(id)
                .execute(db_pool)
                .await?
        }
    };
    Ok(result.rows_affected() > 0)
}

/// Conversation history between two users, ascending by creation time.
/// UUIDv7 ids break timestamp ties in insertion order.
pub async fn fetch_pair(
    db_pool: &SqlitePool,
    me: &str,
    contact: &str,
    limit: i64,
    skip: i64,
) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as(
        "SELECT * FROM messages
         WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1)
         ORDER BY timestamp ASC, id ASC
         LIMIT ?3 OFFSET ?4",
    )
    .bind(me)
    .bind(contact)
    .bind(limit)
    .bind(skip)
    .fetch_all(db_pool)
    .await
}

/// Ids of messages from `contact` to `me` still waiting at Sent. The history
/// fetch walks these through the state machine so senders get notified.
pub async fn undelivered_from(
    db_pool: &SqlitePool,
    me: &str,
    contact: &str,
) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT id FROM messages
         WHERE sender = ?1 AND recipient = ?2 AND status < ?3
         ORDER BY timestamp ASC, id ASC",
    )
    .bind(contact)
    .bind(me)
    .bind(MessageStatus::Delivered)
    .fetch_all(db_pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Everyone `me` has ever exchanged a message with. Used to fan out presence
/// changes to parties with an open conversation.
pub async fn contacts_of(db_pool: &SqlitePool, me: &str) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT CASE WHEN sender = ?1 THEN recipient ELSE sender END AS contact
         FROM messages WHERE sender = ?1 OR recipient = ?1",
    )
    .bind(me)
    .fetch_all(db_pool)
    .await?;
    Ok(rows.into_iter().map(|(contact,)| contact).collect())
}

/// Chat list for `me`: one entry per contact with last message and unread
/// count, newest conversation first. Contacts without a user row are skipped.
pub async fn chat_list(db_pool: &SqlitePool, me: &str) -> sqlx::Result<Vec<ChatListItem>> {
    let mut items = Vec::new();
    for contact in contacts_of(db_pool, me).await? {
        let Some(user) = fetch_user(db_pool, &contact).await? else {
            continue;
        };

        let last: Option<(String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            "SELECT content, timestamp FROM messages
             WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1)
             ORDER BY timestamp DESC, id DESC LIMIT 1",
        )
        .bind(me)
        .bind(&contact)
        .fetch_optional(db_pool)
        .await?;

        let (unread,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages
             WHERE sender = ?1 AND recipient = ?2 AND status != ?3",
        )
        .bind(&contact)
        .bind(me)
        .bind(MessageStatus::Read)
        .fetch_one(db_pool)
        .await?;

        let (last_message, last_message_time) = match last {
            Some((content, time)) => (Some(content), Some(time)),
            None => (None, None),
        };
        items.push(ChatListItem {
            contact_email: user.email,
            contact_name: user.username,
            last_message,
            last_message_time,
            unread_count: unread,
            is_bot: user.is_bot,
        });
    }

    items.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
    Ok(items)
}

/// Delete the whole conversation between two users. Returns rows removed.
pub async fn clear_pair(db_pool: &SqlitePool, me: &str, contact: &str) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "DELETE FROM messages
         WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1)",
    )
    .bind(me)
    .bind(contact)
    .execute(db_pool)
    .await?;
    Ok(result.rows_affected())
}
