pub mod assistant;
pub mod auth;
pub mod client;
pub mod config;
pub mod delivery;
pub mod model;
pub mod presence;
pub mod protocol;
pub mod routes;
pub mod status;
pub mod store;
pub mod typing;
pub mod ws;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::SqlitePool;

use crate::config::Settings;
use crate::presence::Presence;
use crate::typing::TypingTimers;

/// Shared services, one instance each for the process lifetime, handed to
/// every connection task and REST handler through axum state.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub presence: Presence,
    pub typing: TypingTimers,
    pub settings: Settings,
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
