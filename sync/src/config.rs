//! Configuration management for the sync client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_STATE_DIR: &str = ".stats";
const DEFAULT_SIGN_OUT_TIMEOUT_MS: u64 = 2000;
const DEFAULT_AUTH_KEY_PREFIX: &str = "auth.";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Pool size for the remote store
    pub max_connections: u32,
    /// Directory holding the device state file
    pub state_dir: PathBuf,
    /// Upper bound on the remote sign-out call
    pub sign_out_timeout: Duration,
    /// Storage keys with this prefix are cleared on sign-out
    pub auth_key_prefix: String,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first
    /// if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxConnections(raw))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let state_dir = lookup("STATS_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

        let sign_out_timeout = match lookup("SIGN_OUT_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidSignOutTimeout(raw))?,
            None => Duration::from_millis(DEFAULT_SIGN_OUT_TIMEOUT_MS),
        };

        let auth_key_prefix =
            lookup("AUTH_KEY_PREFIX").unwrap_or_else(|| DEFAULT_AUTH_KEY_PREFIX.to_string());

        Ok(Self {
            database_url,
            max_connections,
            state_dir,
            sign_out_timeout,
            auth_key_prefix,
        })
    }

    /// The subset of settings the client itself needs.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            sign_out_timeout: self.sign_out_timeout,
            auth_key_prefix: self.auth_key_prefix.clone(),
        }
    }
}

/// Runtime options for [`crate::StatsClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub sign_out_timeout: Duration,
    pub auth_key_prefix: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            sign_out_timeout: Duration::from_millis(DEFAULT_SIGN_OUT_TIMEOUT_MS),
            auth_key_prefix: DEFAULT_AUTH_KEY_PREFIX.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid DATABASE_MAX_CONNECTIONS value: {0}")]
    InvalidMaxConnections(String),

    #[error("Invalid SIGN_OUT_TIMEOUT_MS value: {0}")]
    InvalidSignOutTimeout(String),
}
