//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SITECRAWL_*)
//! 2. TOML config file (if SITECRAWL_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SITECRAWL_*)
/// 2. TOML config file (if SITECRAWL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite response cache database.
    ///
    /// Set via SITECRAWL_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SITECRAWL_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SITECRAWL_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Days a cached page stays valid.
    ///
    /// Set via SITECRAWL_CACHE_TTL_DAYS environment variable.
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: i64,

    /// Page budget for a single crawl.
    ///
    /// Set via SITECRAWL_MAX_PAGES environment variable.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Only follow links within the start page's domain.
    ///
    /// Set via SITECRAWL_SINGLE_DOMAIN environment variable.
    #[serde(default = "default_true")]
    pub single_domain: bool,

    /// Directory downloaded images are written to.
    ///
    /// Set via SITECRAWL_IMAGE_DIR environment variable.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Number of concurrent workers for batch harvesting.
    ///
    /// Set via SITECRAWL_WORKERS environment variable.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Product slots per harvested domain.
    ///
    /// Set via SITECRAWL_PRODUCT_LIMIT environment variable.
    #[serde(default = "default_product_limit")]
    pub product_limit: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sitecrawl-cache.sqlite")
}

fn default_user_agent() -> String {
    "sitecrawl/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_cache_ttl_days() -> i64 {
    crate::cache::DEFAULT_TTL_DAYS
}

fn default_max_pages() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("./images")
}

fn default_workers() -> usize {
    40
}

fn default_product_limit() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            cache_ttl_days: default_cache_ttl_days(),
            max_pages: default_max_pages(),
            single_domain: true,
            image_dir: default_image_dir(),
            workers: default_workers(),
            product_limit: default_product_limit(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache time-to-live as a chrono Duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.cache_ttl_days)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SITECRAWL_`
    /// 2. TOML file from `SITECRAWL_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SITECRAWL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SITECRAWL_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./sitecrawl-cache.sqlite"));
        assert_eq!(config.user_agent, "sitecrawl/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.cache_ttl_days, 7);
        assert_eq!(config.max_pages, 50);
        assert!(config.single_domain);
        assert_eq!(config.image_dir, PathBuf::from("./images"));
        assert_eq!(config.workers, 40);
        assert_eq!(config.product_limit, 5);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_cache_ttl() {
        let config = AppConfig { cache_ttl_days: 2, ..Default::default() };
        assert_eq!(config.cache_ttl(), chrono::Duration::days(2));
    }

    #[test]
    fn test_figment_merges_toml_over_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("sitecrawl.toml", "max_pages = 3\nsingle_domain = false\n")?;
            jail.set_env("SITECRAWL_CONFIG_FILE", "sitecrawl.toml");
            jail.set_env("SITECRAWL_WORKERS", "4");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.max_pages, 3);
            assert!(!config.single_domain);
            assert_eq!(config.workers, 4);
            assert_eq!(config.user_agent, "sitecrawl/0.1");
            Ok(())
        });
    }
}
