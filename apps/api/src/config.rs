//! # Application Configuration
//!
//! Loaded with the `config` crate in three layers, later layers winning:
//!
//! ```text
//! defaults ──► <dir>/app.toml (optional) ──► environment ──► PORT override
//! ```
//!
//! ## Environment Variables
//! - `DB_SOURCE` - SQLite file path (default: `kasir.db`)
//! - `SERVER_ADDRESS` - bind address (default: `0.0.0.0:8080`)
//! - `DB_MAX_CONNECTIONS` - pool size (default: `5`)
//! - `ORDER_TIMEOUT_SECS` - deadline for placing one order (default: `10`)
//! - `PORT` - when set, the server binds `0.0.0.0:$PORT`

use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database file.
    pub db_source: String,

    /// `host:port` the HTTP server binds.
    pub server_address: String,

    /// Maximum pooled SQLite connections.
    pub db_max_connections: u32,

    /// How long one order placement may take before it is abandoned.
    pub order_timeout_secs: u64,
}

impl AppConfig {
    /// Loads configuration, reading `app.toml` from `dir` if it exists.
    ///
    /// A missing file is not an error.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = dir.as_ref().join("app.toml");

        let settings = Config::builder()
            .set_default("db_source", "kasir.db")?
            .set_default("server_address", "0.0.0.0:8080")?
            .set_default("db_max_connections", 5)?
            .set_default("order_timeout_secs", 10)?
            .add_source(File::from(file).format(FileFormat::Toml).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;

        if let Ok(port) = env::var("PORT") {
            let port = port.trim();
            if !port.is_empty() {
                config.server_address = format!("0.0.0.0:{port}");
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_source.trim().is_empty() {
            return Err(ConfigError::MissingRequired("DB_SOURCE".to_string()));
        }
        if self.server_address.trim().is_empty() {
            return Err(ConfigError::MissingRequired("SERVER_ADDRESS".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.order_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("ORDER_TIMEOUT_SECS".to_string()));
        }
        Ok(())
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_secs(self.order_timeout_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DB_SOURCE",
        "SERVER_ADDRESS",
        "DB_MAX_CONNECTIONS",
        "ORDER_TIMEOUT_SECS",
        "PORT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();

        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.db_source, "kasir.db");
        assert_eq!(config.server_address, "0.0.0.0:8080");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.order_timeout(), Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_missing_file_reads_environment() {
        clear_env();
        env::set_var("DB_SOURCE", "/tmp/env.db");
        env::set_var("SERVER_ADDRESS", "127.0.0.1:9000");
        env::set_var("DB_MAX_CONNECTIONS", "8");
        let dir = tempfile::tempdir().unwrap();

        let config = AppConfig::load(dir.path());
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.db_source, "/tmp/env.db");
        assert_eq!(config.server_address, "127.0.0.1:9000");
        assert_eq!(config.db_max_connections, 8);
    }

    #[test]
    #[serial]
    fn test_file_values_and_env_precedence() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("app.toml"),
            "db_source = \"file.db\"\nserver_address = \"127.0.0.1:7000\"\norder_timeout_secs = 3\n",
        )
        .unwrap();
        env::set_var("DB_SOURCE", "env.db");

        let config = AppConfig::load(dir.path());
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.db_source, "env.db");
        assert_eq!(config.server_address, "127.0.0.1:7000");
        assert_eq!(config.order_timeout_secs, 3);
    }

    #[test]
    #[serial]
    fn test_port_overrides_address() {
        clear_env();
        env::set_var("SERVER_ADDRESS", "127.0.0.1:9000");
        env::set_var("PORT", "3001");
        let dir = tempfile::tempdir().unwrap();

        let config = AppConfig::load(dir.path());
        clear_env();

        assert_eq!(config.unwrap().server_address, "0.0.0.0:3001");
    }

    #[test]
    #[serial]
    fn test_zero_pool_size_is_rejected() {
        clear_env();
        env::set_var("DB_MAX_CONNECTIONS", "0");
        let dir = tempfile::tempdir().unwrap();

        let result = AppConfig::load(dir.path());
        clear_env();

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }
}
