//! Configuration module
//!
//! Configuration is read from the environment (optionally seeded from a `.env`
//! file) once at startup and passed explicitly to the components that need it.

use std::env;
use std::time::Duration;

use crate::constants::DEFAULT_STAGING_PREFIX;
use crate::storage_types::StorageBackend;

const DEFAULT_DATABASE_URL: &str = "sqlite://fentity.db";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./data/files";
const MAX_UPLOAD_SIZE_MB: u64 = 100;
const SWAP_TIMEOUT_SECS: u64 = 30;
const DB_MAX_CONNECTIONS: u32 = 5;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub staging_prefix: String,
    pub max_upload_size_bytes: u64,
    pub swap_timeout_secs: u64,
    /// File type given to uploads without an owner, if set.
    pub anonymous_file_type: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DB_MAX_CONNECTIONS,
            storage_backend: StorageBackend::Local,
            local_storage_path: DEFAULT_LOCAL_STORAGE_PATH.to_string(),
            staging_prefix: DEFAULT_STAGING_PREFIX.to_string(),
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            swap_timeout_secs: SWAP_TIMEOUT_SECS,
            anonymous_file_type: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => defaults.storage_backend,
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be a valid number"))?;

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or(defaults.local_storage_path),
            staging_prefix: env::var("STAGING_PREFIX").unwrap_or(defaults.staging_prefix),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            swap_timeout_secs: env::var("SWAP_TIMEOUT_SECS")
                .unwrap_or_else(|_| SWAP_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SWAP_TIMEOUT_SECS must be a valid number"))?,
            anonymous_file_type: env::var("ANONYMOUS_FILE_TYPE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.trim().is_empty() {
            return Err(anyhow::anyhow!("DATABASE_URL cannot be empty"));
        }
        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be at least 1"));
        }
        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }
        if self.swap_timeout_secs == 0 {
            return Err(anyhow::anyhow!("SWAP_TIMEOUT_SECS must be greater than 0"));
        }
        let prefix = self.staging_prefix.trim_matches('/');
        if prefix.is_empty() || prefix.contains("..") {
            return Err(anyhow::anyhow!(
                "STAGING_PREFIX must be a non-empty relative key prefix"
            ));
        }
        if self.storage_backend == StorageBackend::Local
            && self.local_storage_path.trim().is_empty()
        {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set for the local storage backend"
            ));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn swap_timeout(&self) -> Duration {
        Duration::from_secs(self.swap_timeout_secs)
    }

    pub fn staging_prefix(&self) -> &str {
        self.staging_prefix.trim_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.swap_timeout(), Duration::from_secs(30));
        assert!(!config.is_production());
    }

    #[test]
    fn test_validate_rejects_traversing_staging_prefix() {
        let config = Config {
            staging_prefix: "../tmp".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config {
            swap_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_staging_prefix_is_trimmed() {
        let config = Config {
            staging_prefix: "/pending/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.staging_prefix(), "pending");
    }
}
