use anyhow::Context;

/// Runtime settings, read once at startup from the environment (`.env`
/// supported via dotenv).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub secret_key: String,
    pub cors_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: dotenv::var("DATABASE_URL").context("DATABASE_URL is not set")?,
            secret_key: dotenv::var("SECRET_KEY").context("SECRET_KEY is not set")?,
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            cors_origins: dotenv::var("CORS_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
        })
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
