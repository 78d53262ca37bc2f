//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use lesson_deck_core::BackfillPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// `DATABASE_URL` value selecting the in-memory store instead of Postgres.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub data_dir: PathBuf,
    pub openai_api_key: Option<String>,
    pub web_search_model: String,
    pub design_chunk_size: usize,
    pub design_chunk_delay: Duration,
    pub backfill: BackfillPolicy,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:8000".parse::<SocketAddr>())?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", Ok(5u32))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = lookup("APP_DATA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./app_data"));

        // --- Web Search ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        let web_search_model =
            lookup("WEB_SEARCH_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Workflow Settings ---
        let design_chunk_size = parse_or(&lookup, "DESIGN_CHUNK_SIZE", Ok(10usize))?;
        if design_chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "DESIGN_CHUNK_SIZE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let design_chunk_delay =
            Duration::from_millis(parse_or(&lookup, "DESIGN_CHUNK_DELAY_MS", Ok(100u64))?);

        let defaults = BackfillPolicy::default();
        let backfill = BackfillPolicy {
            persist_target: parse_or(&lookup, "BACKFILL_PERSIST_TARGET", Ok(defaults.persist_target))?,
            persist_outline: parse_or(&lookup, "BACKFILL_PERSIST_OUTLINE", Ok(defaults.persist_outline))?,
            persist_design: parse_or(&lookup, "BACKFILL_PERSIST_DESIGN", Ok(defaults.persist_design))?,
        };

        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", Ok(10 * 1024 * 1024usize))?;

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            data_dir,
            openai_api_key,
            web_search_model,
            design_chunk_size,
            design_chunk_delay,
            backfill,
            max_upload_bytes,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    /// Directory uploaded reference documents are written to.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

/// Parses `key` when present, otherwise falls back to `default`.
fn parse_or<F, T>(lookup: &F, key: &str, default: Result<T, T::Err>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
