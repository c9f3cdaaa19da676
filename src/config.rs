//! Application configuration
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::workflow::access::{RoleStageAccess, DEFAULT_ROLE_STAGE_ACCESS};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database connection URL, required for the Postgres backend
    pub database_url: Option<String>,
    /// Which application store to run against
    pub storage_backend: StorageBackend,
    /// Upload directory path
    pub upload_dir: String,
    /// Maximum upload file size in bytes
    pub max_upload_size: usize,
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: Environment,
    /// Which stage inboxes each role may read
    pub role_stage_access: RoleStageAccess,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match var("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let storage_backend = match var("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let database_url = var("DATABASE_URL").filter(|u| !u.trim().is_empty());
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing(
                "DATABASE_URL is required when STORAGE_BACKEND=postgres".to_string(),
            ));
        }

        let role_stage_access = RoleStageAccess::parse(
            &var("ROLE_STAGE_ACCESS").unwrap_or_else(|| DEFAULT_ROLE_STAGE_ACCESS.to_string()),
        )?;

        Ok(Config {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            database_url,
            storage_backend,
            upload_dir: var("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            max_upload_size: var("MAX_UPLOAD_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024), // 10MB default
            cors_origins: var("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]),
            environment,
            role_stage_access,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowStage;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_database_url() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/permits")]).expect("loads");

        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.upload_dir, "uploads");
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert!(!config.is_production());
        assert!(!config
            .role_stage_access
            .check(Some("4"), WorkflowStage::DcPending.as_str())
            .is_ok());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing(_))));
        assert!(matches!(
            load(&[("DATABASE_URL", "  ")]),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn test_memory_backend_needs_no_database() {
        let config = load(&[("STORAGE_BACKEND", "Memory")]).expect("loads");
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_unknown_backend_is_invalid() {
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "sqlite")]),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STORAGE_BACKEND", "memory"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("ENVIRONMENT", "prod"),
            ("MAX_UPLOAD_SIZE", "2048"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("ROLE_STAGE_ACCESS", "5=OC_PENDING"),
        ])
        .expect("loads");

        assert_eq!(config.server_addr(), "127.0.0.1:9000");
        assert!(config.is_production());
        assert_eq!(config.max_upload_size, 2048);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(config
            .role_stage_access
            .check(Some("4"), WorkflowStage::DcPending.as_str())
            .is_ok());
        assert!(!config
            .role_stage_access
            .check(Some("5"), WorkflowStage::DcPending.as_str())
            .is_ok());
    }

    #[test]
    fn test_bad_role_access_is_rejected() {
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "memory"), ("ROLE_STAGE_ACCESS", "4=NOWHERE")]),
            Err(ConfigError::Invalid(_))
        ));
    }
}
