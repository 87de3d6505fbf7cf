//! Backend selection and connection settings.
//!
//! Two sources:
//! 1. A YAML file (`from_file` / `from_yaml`)
//! 2. Process environment, after loading `.env` if present (`from_env`)
//!
//! ```yaml
//! backend:
//!   kind: postgres
//!   url_env: TAXONOMY_DATABASE_URL
//!   max_connections: 8
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use taxonomy_core::TaxonomyError;
use taxonomy_postgres::PgConfig;
use taxonomy_sqlite::WorkerPool;

pub const ENV_BACKEND: &str = "TAXONOMY_BACKEND";
pub const ENV_SQLITE_PATH: &str = "TAXONOMY_SQLITE_PATH";
pub const ENV_SQLITE_WORKERS: &str = "TAXONOMY_SQLITE_WORKERS";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_POOL_SIZE: &str = "DATABASE_POOL_SIZE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: String, value: String },

    #[error("backend unavailable: {0}")]
    Backend(#[from] TaxonomyError),
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaxonomyConfig {
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Embedded read-only SQLite file
    Sqlite {
        path: PathBuf,
        #[serde(default = "default_workers")]
        workers: usize,
    },
    /// Remote PostgreSQL server
    Postgres(PostgresSettings),
}

/// Remote store settings. `url` wins over `url_env`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostgresSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_url_env")]
    pub url_env: String,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub acquire_timeout_secs: Option<u64>,
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

fn default_workers() -> usize {
    WorkerPool::DEFAULT_SIZE
}

fn default_url_env() -> String {
    ENV_DATABASE_URL.to_string()
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            url: None,
            url_env: default_url_env(),
            max_connections: None,
            acquire_timeout_secs: None,
            idle_timeout_secs: None,
        }
    }
}

impl TaxonomyConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read `TAXONOMY_BACKEND` (default `sqlite`) and the matching variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = lookup(ENV_BACKEND).unwrap_or_else(|| "sqlite".to_string());
        let backend = match kind.to_ascii_lowercase().as_str() {
            "sqlite" => BackendConfig::Sqlite {
                path: lookup(ENV_SQLITE_PATH)
                    .map(PathBuf::from)
                    .ok_or_else(|| ConfigError::MissingEnv(ENV_SQLITE_PATH.into()))?,
                workers: parse_opt(&lookup, ENV_SQLITE_WORKERS)?.unwrap_or_else(default_workers),
            },
            "postgres" | "postgresql" => BackendConfig::Postgres(PostgresSettings {
                url: lookup(ENV_DATABASE_URL),
                max_connections: parse_opt(&lookup, ENV_POOL_SIZE)?,
                ..PostgresSettings::default()
            }),
            _ => {
                return Err(ConfigError::Invalid {
                    key: ENV_BACKEND.into(),
                    value: kind,
                })
            }
        };
        Ok(Self { backend })
    }
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

impl PostgresSettings {
    /// Resolve the URL and overlay any explicit pool settings on `PgConfig`'s defaults.
    pub fn pg_config(&self) -> Result<PgConfig, ConfigError> {
        let url = match &self.url {
            Some(url) => url.clone(),
            None => std::env::var(&self.url_env)
                .map_err(|_| ConfigError::MissingEnv(self.url_env.clone()))?,
        };
        let mut config = PgConfig::new(url);
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
        if let Some(secs) = self.acquire_timeout_secs {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.idle_timeout_secs {
            config.idle_timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }
}
