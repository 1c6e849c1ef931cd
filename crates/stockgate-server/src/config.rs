//! Configuration management

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::audit::{DEFAULT_AUDIT_CAPACITY, DEFAULT_RETENTION_DAYS};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default interval between scheduled audit prunes (1 hour).
pub const DEFAULT_AUDIT_PRUNE_INTERVAL_SECS: u64 = 3600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub audit: AuditConfig,
    pub cors: CorsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Maximum entries kept in memory
    pub capacity: usize,
    /// Age in days after which entries are pruned
    pub retention_days: i64,
    pub prune_interval_secs: u64,
    /// Record gate calls that arrive without an actor
    pub log_anonymous_attempts: bool,
}

impl AuditConfig {
    /// Retention as a duration, or `None` when the day count is out of range
    pub fn retention(&self) -> Option<Duration> {
        Duration::try_days(self.retention_days)
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env();
        config.validate()?;

        Ok(config)
    }

    /// Read the environment without validating
    pub fn from_env() -> Self {
        Config {
            server: ServerConfig {
                host: std::env::var("STOCKGATE_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("STOCKGATE_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "STOCKGATE_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            audit: AuditConfig {
                capacity: env_or("AUDIT_CAPACITY", DEFAULT_AUDIT_CAPACITY),
                retention_days: env_or("AUDIT_RETENTION_DAYS", DEFAULT_RETENTION_DAYS),
                prune_interval_secs: env_or(
                    "AUDIT_PRUNE_INTERVAL_SECS",
                    DEFAULT_AUDIT_PRUNE_INTERVAL_SECS,
                ),
                log_anonymous_attempts: env_or("AUDIT_LOG_ANONYMOUS", true),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.audit.capacity == 0 {
            anyhow::bail!("Audit capacity must be greater than 0");
        }

        if self.audit.retention_days <= 0 {
            anyhow::bail!(
                "Audit retention must be at least one day (got {})",
                self.audit.retention_days
            );
        }

        if self.audit.retention().is_none() {
            anyhow::bail!(
                "Audit retention of {} days is out of range",
                self.audit.retention_days
            );
        }

        if self.audit.prune_interval_secs == 0 {
            anyhow::bail!("Audit prune interval must be greater than 0");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            audit: AuditConfig {
                capacity: DEFAULT_AUDIT_CAPACITY,
                retention_days: DEFAULT_RETENTION_DAYS,
                prune_interval_secs: DEFAULT_AUDIT_PRUNE_INTERVAL_SECS,
                log_anonymous_attempts: true,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 6] = [
        "STOCKGATE_PORT",
        "AUDIT_CAPACITY",
        "AUDIT_RETENTION_DAYS",
        "AUDIT_PRUNE_INTERVAL_SECS",
        "AUDIT_LOG_ANONYMOUS",
        "CORS_ALLOWED_ORIGINS",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("STOCKGATE_PORT", "9090");
        std::env::set_var("AUDIT_CAPACITY", "250");
        std::env::set_var("AUDIT_LOG_ANONYMOUS", "false");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example");

        let config = Config::from_env();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.audit.capacity, 250);
        assert!(!config.audit.log_anonymous_attempts);
        assert_eq!(config.cors.allowed_origins.len(), 2);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_values_fall_back() {
        clear_env();
        std::env::set_var("AUDIT_RETENTION_DAYS", "forever");

        let config = Config::from_env();
        assert_eq!(config.audit.retention_days, DEFAULT_RETENTION_DAYS);

        clear_env();
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = Config::default();
        config.audit.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audit.prune_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audit.retention_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_out_of_range_retention() {
        let mut config = Config::default();
        config.audit.retention_days = i64::MAX;
        assert!(config.audit.retention().is_none());
        assert!(config.validate().is_err());

        config.audit.retention_days = 365;
        assert_eq!(config.audit.retention(), Some(Duration::days(365)));
        assert!(config.validate().is_ok());
    }
}
