//! Collection pipeline: cache lookup, source fetch, snapshot and cache write-through.
//!
//! ```text
//! collect(query, limit, force_refresh)
//!   ├─ cache hit (unless forced) ──────────────► articles
//!   └─ source.fetch (under the source's retry policy)
//!        ├─ empty  ─────────────────────────────► []   (no snapshot, no cache write)
//!        └─ non-empty ─► snapshot write ─► cache put ─► articles
//! ```
//!
//! Fetch failures that survive the retry policy propagate to the caller.

use crate::cache::{CacheStats, NewsCache};
use crate::config::{AppConfig, NewsConfig};
use crate::error::NewsError;
use crate::models::{Article, StoredArticle};
use crate::snapshots::SnapshotStore;
use crate::sources::{self, NewsSource};
use chrono::TimeDelta;
use tracing::{info, instrument, warn};

pub struct Collector {
    source: Box<dyn NewsSource>,
    cache: Option<NewsCache>,
    snapshots: SnapshotStore,
    default_query: String,
    default_limit: usize,
}

impl Collector {
    pub fn new(
        source: Box<dyn NewsSource>,
        cache: Option<NewsCache>,
        snapshots: SnapshotStore,
        defaults: &NewsConfig,
    ) -> Self {
        info!(
            source = source.name(),
            cache = ?cache.as_ref().map(|c| c.dir().display().to_string()),
            snapshots = %snapshots.dir().display(),
            "Collector initialised"
        );
        Self {
            source,
            cache,
            snapshots,
            default_query: defaults.default_region.clone(),
            default_limit: defaults.news_limit,
        }
    }

    /// Wire a collector from configuration: registry source, optional cache, snapshot store.
    pub async fn from_config(config: &AppConfig, use_cache: bool) -> Result<Self, NewsError> {
        let source = sources::create_source(&config.source, config)?;
        let cache = if use_cache && config.cache.enabled {
            let ttl = TimeDelta::try_hours(config.cache.ttl_hours as i64).ok_or_else(|| {
                NewsError::Configuration(format!("cache ttl_hours out of range: {}", config.cache.ttl_hours))
            })?;
            Some(NewsCache::open(&config.cache_path, ttl).await?)
        } else {
            None
        };
        let snapshots = SnapshotStore::open(&config.storage_path).await?;
        Ok(Self::new(source, cache, snapshots, &config.news))
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Collect articles for `query` (default region when `None`), at most `limit`
    /// (configured default when `None`).
    #[instrument(level = "info", skip(self))]
    pub async fn collect(
        &self,
        query: Option<&str>,
        limit: Option<usize>,
        force_refresh: bool,
    ) -> Result<Vec<Article>, NewsError> {
        let query = query.unwrap_or(&self.default_query);
        let limit = limit.unwrap_or(self.default_limit);
        info!(%query, limit, force_refresh, "Starting collection");

        if !force_refresh {
            if let Some(cache) = &self.cache {
                if let Some(articles) = cache.get(query, limit).await {
                    info!(count = articles.len(), "Serving collection from cache");
                    return Ok(articles);
                }
            }
        }

        let articles = self.source.fetch(query, limit).await?;
        if articles.is_empty() {
            warn!(%query, "No articles found");
            return Ok(articles);
        }

        self.snapshots.write(query, &articles).await?;
        if let Some(cache) = &self.cache {
            cache.put(query, limit, &articles).await;
        }
        info!(count = articles.len(), "Collected and saved articles");
        Ok(articles)
    }

    /// Articles of the most recent snapshot; empty when none exists.
    pub async fn load_latest(&self) -> Result<Vec<StoredArticle>, NewsError> {
        let Some(snapshot) = self.snapshots.load_latest().await? else {
            return Ok(Vec::new());
        };
        let malformed = snapshot.malformed_count();
        if malformed > 0 {
            warn!(malformed, total = snapshot.articles.len(), "Latest snapshot holds malformed records");
        }
        Ok(snapshot.articles)
    }

    /// Remove every cache entry; zero when caching is off.
    pub async fn clear_cache(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.clear().await,
            None => 0,
        }
    }

    pub async fn cleanup_cache(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.cleanup_expired().await,
            None => 0,
        }
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::models::tests::{article, ts};
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source returning a fixed answer and counting calls.
    pub(crate) struct FakeSource {
        pub(crate) calls: Arc<AtomicUsize>,
        articles: Vec<Article>,
        fail: bool,
    }

    impl FakeSource {
        pub(crate) fn returning(articles: Vec<Article>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                calls: Arc::clone(&calls),
                articles,
                fail: false,
            };
            (source, calls)
        }

        fn failing() -> (Self, Arc<AtomicUsize>) {
            let (mut source, calls) = Self::returning(Vec::new());
            source.fail = true;
            (source, calls)
        }
    }

    impl NewsSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn fetch<'a>(&'a self, _query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<Article>, NewsError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail {
                Err(NetworkError::Timeout("provider timeout".into()).into())
            } else {
                Ok(self.articles.iter().take(limit).cloned().collect())
            };
            async move { result }.boxed()
        }
    }

    pub(crate) fn three_articles() -> Vec<Article> {
        vec![
            article("Тула: новости дня", "ТСН", 0.7, ts(2024, 3, 1, 10)),
            article("Тульская область готовится", "Слобода", 0.6, ts(2024, 3, 2, 11)),
            article("Новости региона", "Молодой коммунар", 0.3, ts(2024, 3, 3, 12)),
        ]
    }

    pub(crate) async fn collector(dir: &Path, source: FakeSource, ttl: TimeDelta) -> Collector {
        let cache = NewsCache::open(dir.join("cache"), ttl).await.unwrap();
        let snapshots = SnapshotStore::open(dir.join("data")).await.unwrap();
        Collector::new(Box::new(source), Some(cache), snapshots, &NewsConfig::default())
    }

    #[tokio::test]
    async fn test_end_to_end_cold_then_warm() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, calls) = FakeSource::returning(three_articles());
        let c = collector(tmp.path(), source, TimeDelta::hours(1)).await;

        let first = c.collect(Some("Тула"), Some(10), false).await.unwrap();
        assert_eq!(first, three_articles());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.snapshots.list().await.unwrap().len(), 1);

        let cached = c.cache.as_ref().unwrap().get("Тула", 10).await;
        assert_eq!(cached, Some(three_articles()));

        let second = c.collect(Some("Тула"), Some(10), false).await.unwrap();
        assert_eq!(second, three_articles());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.snapshots.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, calls) = FakeSource::returning(three_articles());
        let c = collector(tmp.path(), source, TimeDelta::hours(1)).await;

        c.collect(Some("Тула"), Some(10), false).await.unwrap();
        c.collect(Some("Тула"), Some(10), true).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.snapshots.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_defaults_resolved_from_config() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, _calls) = FakeSource::returning(three_articles());
        let c = collector(tmp.path(), source, TimeDelta::hours(1)).await;

        c.collect(None, None, false).await.unwrap();
        let defaults = NewsConfig::default();
        let cache = c.cache.as_ref().unwrap();
        assert!(cache.get(&defaults.default_region, defaults.news_limit).await.is_some());

        let snap = c.snapshots.load_latest().await.unwrap().unwrap();
        assert_eq!(snap.query, defaults.default_region);
    }

    #[tokio::test]
    async fn test_empty_fetch_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, _calls) = FakeSource::returning(Vec::new());
        let c = collector(tmp.path(), source, TimeDelta::hours(1)).await;

        let articles = c.collect(Some("Тула"), Some(10), false).await.unwrap();
        assert!(articles.is_empty());
        assert!(c.snapshots.list().await.unwrap().is_empty());
        assert_eq!(c.cache_stats().await.unwrap().total_files, 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, _calls) = FakeSource::failing();
        let c = collector(tmp.path(), source, TimeDelta::hours(1)).await;

        let err = c.collect(Some("Тула"), Some(10), false).await.unwrap_err();
        assert!(matches!(err, NewsError::Network(NetworkError::Timeout(_))));
        assert!(c.snapshots.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, calls) = FakeSource::returning(three_articles());
        let c = collector(tmp.path(), source, TimeDelta::zero()).await;

        c.collect(Some("Тула"), Some(10), false).await.unwrap();
        c.collect(Some("Тула"), Some(10), false).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_without_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, calls) = FakeSource::returning(three_articles());
        let snapshots = SnapshotStore::open(tmp.path()).await.unwrap();
        let c = Collector::new(Box::new(source), None, snapshots, &NewsConfig::default());

        c.collect(Some("Тула"), Some(10), false).await.unwrap();
        c.collect(Some("Тула"), Some(10), false).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.cache_stats().await, None);
        assert_eq!(c.clear_cache().await, 0);
    }

    #[tokio::test]
    async fn test_cache_and_snapshots_can_share_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, _calls) = FakeSource::returning(three_articles());
        let cache = NewsCache::open(tmp.path(), TimeDelta::hours(1)).await.unwrap();
        let snapshots = SnapshotStore::open(tmp.path()).await.unwrap();
        let c = Collector::new(Box::new(source), Some(cache), snapshots, &NewsConfig::default());

        c.collect(Some("Тула"), Some(10), false).await.unwrap();
        assert_eq!(c.snapshots.list().await.unwrap().len(), 1);
        assert_eq!(c.load_latest().await.unwrap().len(), 3);

        assert_eq!(c.clear_cache().await, 1);
        assert_eq!(c.snapshots.list().await.unwrap().len(), 1);
        assert_eq!(c.load_latest().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_load_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let (source, _calls) = FakeSource::returning(three_articles());
        let c = collector(tmp.path(), source, TimeDelta::hours(1)).await;

        assert!(c.load_latest().await.unwrap().is_empty());
        c.collect(Some("Тула"), Some(2), false).await.unwrap();
        let latest = c.load_latest().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest.iter().all(|s| !s.is_malformed()));
    }
}
