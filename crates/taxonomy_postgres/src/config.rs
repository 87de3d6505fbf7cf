use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use taxonomy_core::{Result, TaxonomyError};

/// Connection pool settings for the remote store.
#[derive(Debug, Clone)]
pub struct PgConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/taxonomy".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

impl PgConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    pub fn pool_options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);
        if let Some(idle) = self.idle_timeout {
            options = options.idle_timeout(idle);
        }
        if let Some(lifetime) = self.max_lifetime {
            options = options.max_lifetime(lifetime);
        }
        options
    }

    pub async fn connect(&self) -> Result<PgPool> {
        info!(
            url = %mask_database_url(&self.database_url),
            max_connections = self.max_connections,
            "connecting to taxonomy database"
        );
        let pool = self
            .pool_options()
            .connect(&self.database_url)
            .await
            .map_err(|e| {
                warn!("failed to connect to taxonomy database: {}", e);
                TaxonomyError::unavailable("connect", e)
            })?;
        info!("taxonomy database pool ready");
        Ok(pool)
    }
}

/// Hide the password of a connection URL before it reaches a log line.
pub fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let mut masked = parsed.clone();
            if parsed.password().is_some() {
                let _ = masked.set_password(Some("***"));
            }
            masked.to_string()
        }
        Err(_) if url.chars().count() > 20 => {
            let chars: Vec<char> = url.chars().collect();
            let head: String = chars[..10].iter().collect();
            let tail: String = chars[chars.len() - 10..].iter().collect();
            format!("{head}***{tail}")
        }
        Err(_) => "***".to_string(),
    }
}
