//! API server configuration.
//!
//! Sources are layered, later ones winning:
//!
//! ```text
//! ApiConfig::default()  →  sicarga.toml (optional)  →  SICARGA_* env vars
//! ```
//!
//! `SICARGA_CONFIG` points at a different TOML file. `jwt_secret` has no
//! usable default; it must be at least 32 bytes.

use std::path::PathBuf;

use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Minimum HS256 secret length in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

const DEFAULT_CONFIG_FILE: &str = "sicarga.toml";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// SQLite database file.
    pub database_path: PathBuf,

    /// HS256 signing secret.
    pub jwt_secret: String,

    pub access_token_minutes: i64,
    pub refresh_token_days: i64,

    /// Comma-separated list of allowed browser origins.
    pub cors_origins: String,

    /// Root directory for uploaded invoices.
    pub media_dir: PathBuf,

    pub max_upload_bytes: usize,

    /// Filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: PathBuf::from("sicarga.db"),
            jwt_secret: String::new(),
            access_token_minutes: 60,
            refresh_token_days: 7,
            cors_origins: (3000..=3006)
                .map(|port| format!("http://localhost:{}", port))
                .collect::<Vec<_>>()
                .join(","),
            media_dir: PathBuf::from("media"),
            max_upload_bytes: 10 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads defaults, the optional TOML file and `SICARGA_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SICARGA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config = Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("SICARGA"))
            .build()?;

        Self::finish(config)
    }

    /// Defaults overlaid with TOML text (no file, no environment).
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;

        Self::finish(config)
    }

    fn defaults() -> Result<ConfigBuilder<::config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder().add_source(Config::try_from(&ApiConfig::default())?))
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let loaded: ApiConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks values the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::InvalidValue {
                key: "jwt_secret",
                reason: format!("must be at least {} bytes", MIN_SECRET_BYTES),
            });
        }
        if self.access_token_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "access_token_minutes",
                reason: "must be positive".to_string(),
            });
        }
        if self.refresh_token_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "refresh_token_days",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_upload_bytes",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn access_lifetime(&self) -> Duration {
        Duration::minutes(self.access_token_minutes)
    }

    pub fn refresh_lifetime(&self) -> Duration {
        Duration::days(self.refresh_token_days)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
