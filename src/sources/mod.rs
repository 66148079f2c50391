//! News sources the collector can pull articles from.
//!
//! Every source implements [`NewsSource`]: given a query and a limit it
//! returns validated, scored [`Article`]s. Sources are looked up by name
//! through [`create_source`], so the collector never names a concrete type.
//!
//! # Supported Sources
//!
//! | Name | Module | Method | Notes |
//! |------|--------|--------|-------|
//! | `google` / `google_news` | [`google`] | RSS search | Google News search feed, localized by language and country |
//!
//! # Common Patterns
//!
//! Sources:
//! - Wrap the provider call in the configured [`RetryPolicy`](crate::retry::RetryPolicy)
//! - Map provider failures onto [`NetworkError`](crate::error::NetworkError) kinds
//! - Skip (and log) entries that fail article validation

use crate::config::AppConfig;
use crate::error::NewsError;
use crate::models::Article;
use crate::retry::RetryPolicy;
use futures::future::BoxFuture;

pub mod google;

pub use google::GoogleNewsSource;

const SOURCE_NAMES: &[&str] = &["google", "google_news"];

/// Capability shared by all news providers.
pub trait NewsSource: Send + Sync {
    /// Registry name of the source.
    fn name(&self) -> &'static str;

    /// Fetch at most `limit` articles matching `query`.
    fn fetch<'a>(&'a self, query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<Article>, NewsError>>;
}

/// Names accepted by [`create_source`].
pub fn available_sources() -> &'static [&'static str] {
    SOURCE_NAMES
}

/// Build the source registered under `name` (case-insensitive).
///
/// # Errors
///
/// [`NewsError::Configuration`] for an unknown name or a source that cannot
/// be initialised from `config`.
pub fn create_source(name: &str, config: &AppConfig) -> Result<Box<dyn NewsSource>, NewsError> {
    match name.trim().to_lowercase().as_str() {
        "google" | "google_news" => {
            let retry = RetryPolicy::from_config(&config.retry);
            Ok(Box::new(GoogleNewsSource::new(&config.news, retry)?))
        }
        other => Err(NewsError::Configuration(format!(
            "unknown news source {other:?}; available: {}",
            SOURCE_NAMES.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_known_source() {
        let config = AppConfig::default();
        let source = create_source("Google", &config).unwrap();
        assert_eq!(source.name(), "google");
        assert!(create_source("google_news", &config).is_ok());
    }

    #[test]
    fn test_create_unknown_source() {
        let config = AppConfig::default();
        match create_source("unknown_source", &config) {
            Err(NewsError::Configuration(msg)) => assert!(msg.contains("unknown_source")),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("unknown source must not be created"),
        }
    }

    #[test]
    fn test_available_sources() {
        assert!(available_sources().contains(&"google"));
    }
}
