//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection pool and per-call deadline settings.
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub max_idle_time: Duration,
    pub query_timeout: Duration,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub env: String,
    pub db: DbConfig,
    pub log_level: Level,
    pub cors_trusted_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:4000".parse::<SocketAddr>().ok())?;
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_trusted_origins = std::env::var("CORS_TRUSTED_ORIGINS")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        // --- Load Database Settings ---
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let max_open_conns: u32 = parse_var("DB_MAX_OPEN_CONNS", Some(25))?;
        let max_idle_conns: u32 = parse_var("DB_MAX_IDLE_CONNS", Some(25))?;
        let max_idle_secs: u64 = parse_var("DB_MAX_IDLE_TIME", Some(15 * 60))?;
        let query_timeout_ms: u64 = parse_var("DB_QUERY_TIMEOUT_MS", Some(3_000))?;

        if max_open_conns == 0 {
            return Err(ConfigError::InvalidValue(
                "DB_MAX_OPEN_CONNS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if query_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "DB_QUERY_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            env,
            db: DbConfig {
                url,
                max_open_conns,
                // The pool cannot keep more idle connections than it may open.
                max_idle_conns: max_idle_conns.min(max_open_conns),
                max_idle_time: Duration::from_secs(max_idle_secs),
                query_timeout: Duration::from_millis(query_timeout_ms),
            },
            log_level,
            cors_trusted_origins,
        })
    }
}

/// Reads and parses `name`, falling back to `default` when it is unset.
fn parse_var<T>(name: &str, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => default.ok_or_else(|| ConfigError::MissingVar(name.to_string())),
    }
}
