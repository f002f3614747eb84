use anyhow::Context;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use whisperwire::config::Settings;
use whisperwire::presence::Presence;
use whisperwire::typing::TypingTimers;
use whisperwire::{AppState, assistant, routes, store, ws};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&settings.database_url)
        .await
        .context("failed to open database")?;
    store::init(&db_pool).await?;
    assistant::ensure_user(&db_pool).await?;

    let cors = if settings.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = settings
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let bind_addr = settings.bind_addr.clone();
    let app_state = AppState {
        db_pool,
        presence: Presence::new(),
        typing: TypingTimers::new(),
        settings,
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::upgrade))
        .nest("/api/messages", routes::router())
        .with_state(app_state)
        .layer(cors);

    info!(addr = %bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
