//! services/app/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
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

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: Level,
    pub credential_cache_path: PathBuf,
    pub store_latency: Duration,
    pub demo_email: String,
    pub demo_password: String,
    pub demo_items: Vec<String>,
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

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let credential_cache_path = lookup("CREDENTIAL_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./.todo/credentials.json"));

        let store_latency = match lookup("STORE_LATENCY_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| {
                    ConfigError::InvalidValue("STORE_LATENCY_MS".to_string(), e.to_string())
                })?,
            None => Duration::ZERO,
        };

        // --- Scripted session used by the binary ---
        let demo_email =
            lookup("DEMO_EMAIL").unwrap_or_else(|| "demo@example.com".to_string());
        let demo_password = lookup("DEMO_PASSWORD")
            .ok_or_else(|| ConfigError::MissingVar("DEMO_PASSWORD".to_string()))?;
        let demo_items = lookup("DEMO_ITEMS")
            .unwrap_or_else(|| "buy milk".to_string())
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            log_level,
            credential_cache_path,
            store_latency,
            demo_email,
            demo_password,
            demo_items,
        })
    }
}
