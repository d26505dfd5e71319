//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub instance: InstanceConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Instance identity, used to generate URIs for local objects
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Public domain (e.g., "social.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl InstanceConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://social.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub media: MediaStorageConfig,
}

/// Media storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaStorageConfig {
    /// Directory attachment files are stored under
    pub path: PathBuf,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum items in timeline cache (default: 2000)
    pub timeline_max_items: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (RUSTRESORT_WORKERS__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("instance.protocol", "http")?
            .set_default("database.path", "data/rustresort.db")?
            .set_default("storage.media.path", "data/media")?
            .set_default("cache.timeline_max_items", 2000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (RUSTRESORT_WORKERS__*)
            .add_source(
                Environment::with_prefix("RUSTRESORT_WORKERS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.instance.domain.trim().is_empty() {
            return Err(AppError::Config(
                "instance.domain must not be empty".to_string(),
            ));
        }

        if !matches!(self.instance.protocol.as_str(), "http" | "https") {
            return Err(AppError::Config(format!(
                "instance.protocol must be http or https, got {}",
                self.instance.protocol
            )));
        }

        if self.instance.protocol == "http" {
            if is_local_domain(&self.instance.domain) {
                let host = normalized_host(&self.instance.domain);
                tracing::warn!(host = %host, "Generating http URIs for local development");
            } else {
                return Err(AppError::Config(
                    "instance.protocol must be https for non-local domains".to_string(),
                ));
            }
        }

        if self.cache.timeline_max_items == 0 {
            return Err(AppError::Config(
                "cache.timeline_max_items must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be pretty or json, got {}",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn normalized_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_domain(domain: &str) -> bool {
    let host = normalized_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    // IPv6 hosts come back bracketed from the url crate
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            instance: InstanceConfig {
                domain: "localhost:8080".to_string(),
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/rustresort-workers-test.db"),
            },
            storage: StorageConfig {
                media: MediaStorageConfig {
                    path: PathBuf::from("/tmp/rustresort-workers-media"),
                },
            },
            cache: CacheConfig {
                timeline_max_items: 2000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.instance.base_url(), "http://localhost:8080");
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.instance.domain = "social.example.com".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            AppError::Config(message) if message.contains("instance.protocol must be https")
        ));

        config.instance.protocol = "https".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = valid_config();
        config.logging.format = "xml".to_string();

        let error = config.validate().expect_err("unknown log format must fail");
        assert!(matches!(
            error,
            AppError::Config(message) if message.contains("logging.format")
        ));
    }

    #[test]
    fn validate_rejects_empty_timeline_cache() {
        let mut config = valid_config();
        config.cache.timeline_max_items = 0;
        assert!(config.validate().is_err());
    }
}
