//! Application-facing operations on top of the [`Collector`].
//!
//! The collector returns raw provider output; the service cleans it up for
//! display (dedupe, quality filter, ordering) and answers read-only
//! questions from the latest snapshot.

use crate::cache::CacheStats;
use crate::collector::Collector;
use crate::config::AppConfig;
use crate::error::NewsError;
use crate::models::{Article, Category, StoredArticle};
use crate::outputs::{self, ExportFormat};
use crate::utils::now_naive;
use chrono::{NaiveDateTime, TimeDelta};
use itertools::{Itertools, MinMaxResult};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

const MIN_TITLE_CHARS: usize = 5;
const MAX_AGE_DAYS: i64 = 7;
const MIN_RELEVANCE: f64 = 0.1;

const HIGH_RELEVANCE: f64 = 0.7;
const MEDIUM_RELEVANCE: f64 = 0.4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelevanceBuckets {
    /// score > 0.7
    pub high: usize,
    /// 0.4 < score <= 0.7
    pub medium: usize,
    /// score <= 0.4
    pub low: usize,
}

impl RelevanceBuckets {
    fn tally<'a>(articles: impl IntoIterator<Item = &'a Article>) -> Self {
        articles.into_iter().fold(Self::default(), |mut b, a| {
            let s = a.relevance_score();
            if s > HIGH_RELEVANCE {
                b.high += 1;
            } else if s > MEDIUM_RELEVANCE {
                b.medium += 1;
            } else {
                b.low += 1;
            }
            b
        })
    }
}

/// Summary of the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsStatistics {
    pub total_articles: usize,
    pub malformed_articles: usize,
    pub date_range: Option<(NaiveDateTime, NaiveDateTime)>,
    pub sources: BTreeMap<String, usize>,
    pub categories: BTreeMap<Category, usize>,
    pub relevance: RelevanceBuckets,
    pub cache: Option<CacheStats>,
}

/// Highest relevance first, newest first among equals.
fn by_relevance_then_date(a: &Article, b: &Article) -> Ordering {
    b.relevance_score()
        .total_cmp(&a.relevance_score())
        .then_with(|| b.published_at().cmp(&a.published_at()))
}

fn sort_for_display(articles: &mut [Article]) {
    articles.sort_by(by_relevance_then_date);
}

/// Dedupe by id, drop low-quality entries, order for display.
fn process(articles: Vec<Article>, now: NaiveDateTime) -> Vec<Article> {
    let oldest = now - TimeDelta::days(MAX_AGE_DAYS);
    let before = articles.len();
    let mut kept: Vec<Article> = articles
        .into_iter()
        .unique_by(|a| a.id().to_string())
        .filter(|a| a.title().trim().chars().count() >= MIN_TITLE_CHARS)
        .filter(|a| a.published_at() >= oldest)
        .filter(|a| a.relevance_score() >= MIN_RELEVANCE)
        .collect();
    sort_for_display(&mut kept);
    debug!(before, after = kept.len(), "Processed articles");
    kept
}

fn valid_articles(stored: Vec<StoredArticle>) -> Vec<Article> {
    stored.into_iter().filter_map(StoredArticle::into_article).collect()
}

pub struct NewsService {
    collector: Collector,
    export_dir: PathBuf,
}

impl NewsService {
    pub fn new(collector: Collector, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            collector,
            export_dir: export_dir.into(),
        }
    }

    pub async fn from_config(config: &AppConfig, use_cache: bool) -> Result<Self, NewsError> {
        let collector = Collector::from_config(config, use_cache).await?;
        Ok(Self::new(collector, &config.storage_path))
    }

    pub fn source_name(&self) -> &'static str {
        self.collector.source_name()
    }

    #[instrument(level = "info", skip(self))]
    pub async fn collect_news(
        &self,
        query: Option<&str>,
        limit: Option<usize>,
        force_refresh: bool,
    ) -> Result<Vec<Article>, NewsError> {
        let raw = self.collector.collect(query, limit, force_refresh).await?;
        let articles = process(raw, now_naive());
        info!(count = articles.len(), "Collected news ready");
        Ok(articles)
    }

    /// First `limit` valid articles of the latest snapshot, display-ordered.
    pub async fn latest_news(&self, limit: usize) -> Result<Vec<Article>, NewsError> {
        let mut articles = valid_articles(self.collector.load_latest().await?);
        articles.truncate(limit);
        sort_for_display(&mut articles);
        Ok(articles)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn search_news(
        &self,
        query: &str,
        limit: usize,
        min_relevance: f64,
    ) -> Result<Vec<Article>, NewsError> {
        let mut found: Vec<Article> = self
            .collect_news(Some(query), Some(limit.saturating_mul(2)), false)
            .await?
            .into_iter()
            .filter(|a| a.relevance_score() >= min_relevance)
            .collect();
        found.truncate(limit);
        Ok(found)
    }

    pub async fn news_by_category(&self, category: Category, limit: usize) -> Result<Vec<Article>, NewsError> {
        Ok(self
            .latest_news(limit.saturating_mul(3))
            .await?
            .into_iter()
            .filter(|a| a.category() == category)
            .take(limit)
            .collect())
    }

    /// Case-insensitive substring match on the source name.
    pub async fn news_by_source(&self, source: &str, limit: usize) -> Result<Vec<Article>, NewsError> {
        let needle = source.to_lowercase();
        Ok(self
            .latest_news(limit.saturating_mul(3))
            .await?
            .into_iter()
            .filter(|a| a.source().to_lowercase().contains(&needle))
            .take(limit)
            .collect())
    }

    pub async fn statistics(&self) -> Result<NewsStatistics, NewsError> {
        let stored = self.collector.load_latest().await?;
        let articles: Vec<&Article> = stored.iter().filter_map(StoredArticle::as_article).collect();
        let malformed_articles = stored.len() - articles.len();

        let date_range = match articles.iter().map(|a| a.published_at()).minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(t) => Some((t, t)),
            MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
        };
        let sources = articles
            .iter()
            .map(|a| a.source().to_string())
            .counts()
            .into_iter()
            .collect();
        let categories = articles.iter().map(|a| a.category()).counts().into_iter().collect();

        Ok(NewsStatistics {
            total_articles: articles.len(),
            malformed_articles,
            date_range,
            sources,
            categories,
            relevance: RelevanceBuckets::tally(articles.iter().copied()),
            cache: self.collector.cache_stats().await,
        })
    }

    pub async fn clear_cache(&self) -> usize {
        let removed = self.collector.clear_cache().await;
        info!(removed, "Cache cleared");
        removed
    }

    pub async fn cleanup_cache(&self) -> usize {
        let removed = self.collector.cleanup_cache().await;
        info!(removed, "Expired cache entries removed");
        removed
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        self.collector.cache_stats().await
    }

    /// Export the latest `limit` articles; returns the written file.
    pub async fn export_news(&self, format: ExportFormat, limit: usize) -> Result<PathBuf, NewsError> {
        let articles = self.latest_news(limit).await?;
        outputs::write_export(&self.export_dir, format, &articles, now_naive()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::tests::{FakeSource, collector, three_articles};
    use crate::models::tests::{article, ts};
    use crate::models::ArticleDraft;
    use std::path::Path;

    fn recent(title: &str, source: &str, score: f64, hours_ago: i64) -> Article {
        article(title, source, score, now_naive() - TimeDelta::hours(hours_ago))
    }

    fn with_category(title: &str, category: Category) -> Article {
        let mut d = ArticleDraft::new(
            Article::id_for(title, "ТСН"),
            title,
            "https://example.com/c",
            "ТСН",
            now_naive(),
        );
        d.category = category;
        d.relevance_score = 0.5;
        Article::new(d).unwrap()
    }

    async fn service(dir: &Path, articles: Vec<Article>) -> NewsService {
        let (source, _calls) = FakeSource::returning(articles);
        NewsService::new(collector(dir, source, TimeDelta::hours(1)).await, dir.join("data"))
    }

    #[test]
    fn test_process_filters_dedupes_and_orders() {
        let now = ts(2024, 3, 10, 12);
        let dup = article("Тула: новости дня", "ТСН", 0.5, ts(2024, 3, 9, 12));
        let input = vec![
            dup.clone(),
            dup,
            article("Тула", "ТСН", 0.9, ts(2024, 3, 9, 12)),
            article("Старые новости Тулы", "ТСН", 0.9, ts(2024, 3, 1, 12)),
            article("Нерелевантные новости", "ТСН", 0.05, ts(2024, 3, 9, 12)),
            article("Главная новость Тулы", "ТСН", 0.8, ts(2024, 3, 8, 12)),
            article("Свежая новость Тулы", "ТСН", 0.5, ts(2024, 3, 10, 11)),
        ];
        let titles: Vec<String> = process(input, now).iter().map(|a| a.title().to_string()).collect();
        assert_eq!(
            titles,
            vec!["Главная новость Тулы", "Свежая новость Тулы", "Тула: новости дня"]
        );
    }

    #[test]
    fn test_relevance_buckets() {
        let at = ts(2024, 3, 1, 10);
        let articles = [
            article("Первая новость", "ТСН", 0.71, at),
            article("Вторая новость", "ТСН", 0.7, at),
            article("Третья новость", "ТСН", 0.41, at),
            article("Четвертая новость", "ТСН", 0.4, at),
            article("Пятая новость", "ТСН", 0.0, at),
        ];
        assert_eq!(
            RelevanceBuckets::tally(&articles),
            RelevanceBuckets {
                high: 1,
                medium: 2,
                low: 2
            }
        );
    }

    #[tokio::test]
    async fn test_collect_news_processes_collector_output() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(
            tmp.path(),
            vec![
                recent("Тула: низкая релевантность", "ТСН", 0.3, 2),
                recent("Тула: высокая релевантность", "ТСН", 0.9, 5),
                recent("Тула: прошлогодняя новость", "ТСН", 0.9, 24 * 30),
            ],
        )
        .await;

        let got = svc.collect_news(Some("Тула"), Some(10), false).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].title(), "Тула: высокая релевантность");
    }

    #[tokio::test]
    async fn test_search_applies_min_relevance_and_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(
            tmp.path(),
            vec![
                recent("Первая новость Тулы", "ТСН", 0.9, 1),
                recent("Вторая новость Тулы", "ТСН", 0.8, 1),
                recent("Третья новость Тулы", "ТСН", 0.2, 1),
            ],
        )
        .await;

        let got = svc.search_news("Тула", 1, 0.5).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].title(), "Первая новость Тулы");

        let got = svc.search_news("Тула", 5, 0.5).await.unwrap();
        assert_eq!(got.len(), 2);
    }

    #[tokio::test]
    async fn test_huge_limits_do_not_overflow() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), three_articles()).await;
        svc.collector.collect(Some("Тула"), Some(10), false).await.unwrap();

        assert!(svc.search_news("Тула", usize::MAX, 0.0).await.is_ok());
        assert_eq!(svc.news_by_category(Category::Other, usize::MAX).await.unwrap().len(), 3);
        assert_eq!(svc.news_by_source("тсн", usize::MAX).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_latest_news_and_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(
            tmp.path(),
            vec![
                with_category("Матч в Туле", Category::Sport),
                with_category("Выборы в области", Category::Politics),
                recent("Тула: концерт", "Слобода", 0.6, 1),
            ],
        )
        .await;
        assert!(svc.latest_news(10).await.unwrap().is_empty());

        svc.collect_news(Some("Тула"), Some(10), false).await.unwrap();
        assert_eq!(svc.latest_news(10).await.unwrap().len(), 3);
        assert_eq!(svc.latest_news(2).await.unwrap().len(), 2);

        let sport = svc.news_by_category(Category::Sport, 10).await.unwrap();
        assert_eq!(sport.len(), 1);
        assert_eq!(sport[0].title(), "Матч в Туле");

        let by_source = svc.news_by_source("слоб", 10).await.unwrap();
        assert_eq!(by_source.len(), 1);
        assert_eq!(by_source[0].source(), "Слобода");
    }

    #[tokio::test]
    async fn test_statistics() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), three_articles()).await;

        let empty = svc.statistics().await.unwrap();
        assert_eq!(empty.total_articles, 0);
        assert_eq!(empty.date_range, None);

        svc.collector.collect(Some("Тула"), Some(10), false).await.unwrap();
        let stats = svc.statistics().await.unwrap();
        assert_eq!(stats.total_articles, 3);
        assert_eq!(stats.malformed_articles, 0);
        assert_eq!(stats.date_range, Some((ts(2024, 3, 1, 10), ts(2024, 3, 3, 12))));
        assert_eq!(stats.sources.get("ТСН"), Some(&1));
        assert_eq!(stats.categories.get(&Category::Other), Some(&3));
        assert_eq!(
            stats.relevance,
            RelevanceBuckets {
                high: 0,
                medium: 2,
                low: 1
            }
        );
        assert_eq!(stats.cache.unwrap().total_files, 1);
    }

    #[tokio::test]
    async fn test_export_and_cache_maintenance() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), three_articles()).await;
        svc.collector.collect(Some("Тула"), Some(10), false).await.unwrap();

        let path = svc.export_news(ExportFormat::Csv, 10).await.unwrap();
        let body = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(body.lines().count(), 4);

        // exports must not be mistaken for snapshots
        let latest = svc.collector.load_latest().await.unwrap();
        assert!(latest.iter().all(|s| matches!(s, StoredArticle::Valid(_))));

        assert_eq!(svc.cleanup_cache().await, 0);
        assert_eq!(svc.clear_cache().await, 1);
        assert_eq!(svc.cache_stats().await.unwrap().total_files, 0);
    }
}
