//! Application configuration.
//!
//! Built once in `main` and passed by reference into the collector, cache and
//! source constructors. Sources are layered, later ones winning:
//!
//! 1. Built-in defaults
//! 2. An optional YAML file (`--config config.yaml`); every key is optional
//! 3. Environment variables, including those loaded from `.env` by `dotenvy`
//!
//! ```yaml
//! storage_path: storage/news_data
//! news:
//!   default_region: "Тула, Тульская область"
//!   news_limit: 20
//! cache:
//!   ttl_hours: 2
//! retry:
//!   max_attempts: 5
//! ```

use crate::error::NewsError;
use crate::sources;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_name: String,
    pub log_level: String,
    /// Directory holding snapshot and export files.
    pub storage_path: PathBuf,
    /// Directory holding cache entry files.
    pub cache_path: PathBuf,
    /// Registry name of the news source.
    pub source: String,
    pub news: NewsConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub default_region: String,
    pub news_limit: usize,
    pub language: String,
    pub country: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: Option<u64>,
    pub jitter_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "TulaNewsAgent".to_string(),
            log_level: "info".to_string(),
            storage_path: PathBuf::from("storage/news_data"),
            cache_path: PathBuf::from("storage/cache"),
            source: "google".to_string(),
            news: NewsConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            default_region: "Тула, Тульская область".to_string(),
            news_limit: 10,
            language: "ru".to_string(),
            country: "RU".to_string(),
            request_timeout_secs: 30,
            user_agent: concat!("regional_news/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: 1,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: Some(30_000),
            jitter_ms: 250,
        }
    }
}

impl AppConfig {
    /// Load defaults, then the optional YAML file, then the process environment.
    pub fn load(yaml_path: Option<&Path>) -> Result<Self, NewsError> {
        let mut config = match yaml_path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            app = %config.app_name,
            source = %config.source,
            storage = %config.storage_path.display(),
            cache = %config.cache_path.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, NewsError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            NewsError::Configuration(format!("cannot read config file {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Read YAML configuration");
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, NewsError> {
        serde_yaml::from_str(text).map_err(|e| NewsError::Configuration(format!("invalid YAML config: {e}")))
    }

    /// Override fields from environment-style variables supplied by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), NewsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("APP_NAME") {
            self.app_name = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("STORAGE_PATH") {
            self.storage_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CACHE_PATH") {
            self.cache_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("NEWS_SOURCE") {
            self.source = v;
        }
        if let Some(v) = lookup("DEFAULT_REGION") {
            self.news.default_region = v;
        }
        if let Some(v) = lookup("LANGUAGE") {
            self.news.language = v;
        }
        if let Some(v) = lookup("COUNTRY") {
            self.news.country = v;
        }
        parse_env(&lookup, "NEWS_LIMIT", &mut self.news.news_limit)?;
        parse_env(&lookup, "REQUEST_TIMEOUT", &mut self.news.request_timeout_secs)?;
        parse_env(&lookup, "USE_CACHE", &mut self.cache.enabled)?;
        parse_env(&lookup, "CACHE_TTL_HOURS", &mut self.cache.ttl_hours)?;
        parse_env(&lookup, "RETRY_MAX_ATTEMPTS", &mut self.retry.max_attempts)?;
        parse_env(&lookup, "RETRY_BASE_DELAY_MS", &mut self.retry.base_delay_ms)?;
        parse_env(&lookup, "RETRY_BACKOFF", &mut self.retry.backoff_multiplier)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), NewsError> {
        if self.news.default_region.trim().is_empty() {
            return Err(NewsError::Configuration("default_region must not be empty".into()));
        }
        if self.news.news_limit == 0 {
            return Err(NewsError::Configuration("news_limit must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(NewsError::Configuration("retry.max_attempts must be at least 1".into()));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(NewsError::Configuration(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if !sources::available_sources().contains(&self.source.to_lowercase().as_str()) {
            return Err(NewsError::Configuration(format!(
                "unknown news source {:?}; available: {}",
                self.source,
                sources::available_sources().join(", ")
            )));
        }
        Ok(())
    }
}

fn parse_env<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<(), NewsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| NewsError::Configuration(format!("{key}={raw:?}: {e}")))?;
    }
    Ok(())
}
