//! REST collaborator interface: cold-start sources the clients reconcile
//! against the push stream.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::model::{ChatListItem, Message};
use crate::{AppResult, AppState, assistant, status, store};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(history))
        .route("/chats", get(chat_list))
        .route("/assistant", get(assistant_history).delete(clear_assistant))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    contact_email: String,
    limit: Option<i64>,
    skip: Option<i64>,
}

/// Pair history, ascending by time. Fetching is what lazily delivers: any of
/// the contact's messages still at Sent advance to Delivered here, so an
/// online sender sees `message_delivered` pushes for its backlog.
async fn history(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<Message>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let skip = query.skip.unwrap_or(0).max(0);
    let contact = &query.contact_email;

    for id in store::undelivered_from(&state.db_pool, &me, contact).await? {
        status::mark_delivered(&state.db_pool, &state.presence, &id).await?;
    }

    let messages = store::fetch_pair(&state.db_pool, &me, contact, limit, skip).await?;
    info!(user = %me, contact = %contact, count = messages.len(), "history fetched");
    Ok(Json(messages))
}

/// Per-contact summaries, newest conversation first.
async fn chat_list(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<Vec<ChatListItem>>> {
    Ok(Json(store::chat_list(&state.db_pool, &me).await?))
}

async fn assistant_history(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<Vec<Message>>> {
    let messages =
        store::fetch_pair(&state.db_pool, &me, assistant::ASSISTANT_EMAIL, 200, 0).await?;
    Ok(Json(messages))
}

async fn clear_assistant(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let removed = store::clear_pair(&state.db_pool, &me, assistant::ASSISTANT_EMAIL).await?;
    info!(user = %me, removed, "assistant history cleared");
    Ok(Json(serde_json::json!({ "deleted": removed })))
}
