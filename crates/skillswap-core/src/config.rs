//! Configuration management
//!
//! Handles configuration from environment variables and config files with
//! sensible defaults for development. The token signing secrets are the one
//! exception: they have no default and their absence aborts startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Token and session configuration
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails when `AUTH_ACCESS_SECRET` or `AUTH_REFRESH_SECRET` is unset:
    /// a token authority without signing secrets must not start.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Auth
        config.auth = AuthConfig::from_env()?;

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file, then validate the auth section
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;

        config.auth.validate()?;
        Ok(config)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Token and session configuration
///
/// Access and refresh tokens are signed with different secrets so that a
/// leak of one does not compromise the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    pub access_secret: String,

    /// HMAC secret for refresh tokens
    pub refresh_secret: String,

    /// Access token lifetime in seconds (default: 900 = 15 minutes)
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds (default: 604800 = 7 days)
    pub refresh_ttl_secs: u64,

    /// Token issuer claim
    pub issuer: String,

    /// Token audience claim
    pub audience: String,

    /// Argon2 memory cost in KiB
    pub argon_memory_kib: u32,

    /// Argon2 iteration count
    pub argon_iterations: u32,

    /// Argon2 parallelism
    pub argon_parallelism: u32,

    /// How long a revoked token with unreadable claims is retained before
    /// fallback eviction (default: 86400 = 1 day)
    pub revoked_fallback_ttl_secs: u64,

    /// Interval between cleanup sweeps in seconds (default: 3600 = 1 hour)
    pub sweep_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: "development-access-secret-change-in-production".to_string(),
            refresh_secret: "development-refresh-secret-change-in-production".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 7 * 24 * 3600,
            issuer: "skillswap-auth".to_string(),
            audience: "skillswap-clients".to_string(),
            argon_memory_kib: 65536, // 64 MB
            argon_iterations: 3,
            argon_parallelism: 4,
            revoked_fallback_ttl_secs: 24 * 3600,
            sweep_interval_secs: 3600,
        }
    }
}

impl AuthConfig {
    /// Load the auth section from environment variables.
    ///
    /// Secrets are required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_secret = std::env::var("AUTH_ACCESS_SECRET")
            .map_err(|_| ConfigError::MissingRequired("AUTH_ACCESS_SECRET".to_string()))?;
        let refresh_secret = std::env::var("AUTH_REFRESH_SECRET")
            .map_err(|_| ConfigError::MissingRequired("AUTH_REFRESH_SECRET".to_string()))?;

        let defaults = Self::default();
        let config = Self {
            access_secret,
            refresh_secret,
            access_ttl_secs: env_u64("AUTH_ACCESS_TTL_SECS")?.unwrap_or(defaults.access_ttl_secs),
            refresh_ttl_secs: env_u64("AUTH_REFRESH_TTL_SECS")?
                .unwrap_or(defaults.refresh_ttl_secs),
            issuer: std::env::var("AUTH_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("AUTH_AUDIENCE").unwrap_or(defaults.audience),
            argon_memory_kib: env_u64("AUTH_ARGON_MEMORY_KIB")?
                .map(|v| v as u32)
                .unwrap_or(defaults.argon_memory_kib),
            argon_iterations: env_u64("AUTH_ARGON_ITERATIONS")?
                .map(|v| v as u32)
                .unwrap_or(defaults.argon_iterations),
            argon_parallelism: env_u64("AUTH_ARGON_PARALLELISM")?
                .map(|v| v as u32)
                .unwrap_or(defaults.argon_parallelism),
            revoked_fallback_ttl_secs: env_u64("AUTH_REVOKED_FALLBACK_TTL_SECS")?
                .unwrap_or(defaults.revoked_fallback_ttl_secs),
            sweep_interval_secs: env_u64("AUTH_SWEEP_INTERVAL_SECS")?
                .unwrap_or(defaults.sweep_interval_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot safely sign tokens
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.access_secret".to_string()));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.refresh_secret".to_string()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue {
                key: "auth.refresh_secret".to_string(),
                value: "must differ from auth.access_secret".to_string(),
            });
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.access_ttl_secs, 900);
        assert_eq!(config.auth.refresh_ttl_secs, 7 * 24 * 3600);
        assert_eq!(config.auth.issuer, "skillswap-auth");
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let config = AuthConfig {
            access_secret: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validate_rejects_shared_secret() {
        let config = AuthConfig {
            access_secret: "same".to_string(),
            refresh_secret: "same".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(AuthConfig::default().validate().is_ok());
    }
}
