//! Plain-text tables for the terminal.
//!
//! Renderers return `String`s; printing is left to `main`.

use crate::cache::CacheStats;
use crate::config::AppConfig;
use crate::models::Article;
use crate::service::NewsStatistics;
use crate::utils::ellipsize;
use std::fmt::Write;

const TITLE_WIDTH: usize = 60;
const SOURCE_WIDTH: usize = 20;

pub fn articles_table(heading: &str, articles: &[Article]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{heading} ({})", articles.len());
    let _ = writeln!(
        out,
        "{:>3}  {:<TITLE_WIDTH$}  {:<SOURCE_WIDTH$}  {:<16}  {:>5}",
        "#", "Title", "Source", "Published", "Rel"
    );
    let _ = writeln!(out, "{}", "-".repeat(3 + 2 + TITLE_WIDTH + 2 + SOURCE_WIDTH + 2 + 16 + 2 + 5));
    for (i, a) in articles.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<TITLE_WIDTH$}  {:<SOURCE_WIDTH$}  {:<16}  {:>5.2}",
            i + 1,
            ellipsize(a.title(), TITLE_WIDTH),
            ellipsize(a.source(), SOURCE_WIDTH),
            a.published_at().format("%Y-%m-%d %H:%M"),
            a.relevance_score()
        );
    }
    out
}

fn cache_block(out: &mut String, stats: &CacheStats) {
    let _ = writeln!(out, "Cache ({})", stats.cache_dir.display());
    let _ = writeln!(out, "  files:   {} ({} valid, {} expired)", stats.total_files, stats.valid_files, stats.expired_files);
    let _ = writeln!(out, "  size:    {:.1} KiB", stats.total_size_bytes as f64 / 1024.0);
    let _ = writeln!(out, "  ttl:     {} h", stats.ttl_hours);
}

pub fn statistics(stats: &NewsStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Articles: {}", stats.total_articles);
    if stats.malformed_articles > 0 {
        let _ = writeln!(out, "Malformed records: {}", stats.malformed_articles);
    }
    if let Some((from, to)) = stats.date_range {
        let _ = writeln!(out, "Published: {} .. {}", from.format("%Y-%m-%d %H:%M"), to.format("%Y-%m-%d %H:%M"));
    }

    let _ = writeln!(
        out,
        "Relevance: high {} / medium {} / low {}",
        stats.relevance.high, stats.relevance.medium, stats.relevance.low
    );

    if !stats.sources.is_empty() {
        let _ = writeln!(out, "Sources:");
        for (name, count) in &stats.sources {
            let _ = writeln!(out, "  {:<SOURCE_WIDTH$}  {count}", ellipsize(name, SOURCE_WIDTH));
        }
    }
    if !stats.categories.is_empty() {
        let _ = writeln!(out, "Categories:");
        for (category, count) in &stats.categories {
            let _ = writeln!(out, "  {:<SOURCE_WIDTH$}  {count}", category.as_str());
        }
    }
    if let Some(cache) = &stats.cache {
        cache_block(&mut out, cache);
    }
    out
}

pub fn cache_stats(stats: Option<&CacheStats>) -> String {
    match stats {
        Some(stats) => {
            let mut out = String::new();
            cache_block(&mut out, stats);
            out
        }
        None => "Cache is disabled\n".to_string(),
    }
}

pub fn config(config: &AppConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", config.app_name);
    let _ = writeln!(out, "  source:          {}", config.source);
    let _ = writeln!(out, "  default region:  {}", config.news.default_region);
    let _ = writeln!(out, "  news limit:      {}", config.news.news_limit);
    let _ = writeln!(out, "  locale:          {}/{}", config.news.language, config.news.country);
    let _ = writeln!(out, "  request timeout: {} s", config.news.request_timeout_secs);
    let _ = writeln!(out, "  storage path:    {}", config.storage_path.display());
    let _ = writeln!(
        out,
        "  cache:           {} (ttl {} h, {})",
        if config.cache.enabled { "on" } else { "off" },
        config.cache.ttl_hours,
        config.cache_path.display()
    );
    let _ = writeln!(
        out,
        "  retry:           {} attempts, base {} ms, x{}",
        config.retry.max_attempts, config.retry.base_delay_ms, config.retry.backoff_multiplier
    );
    let _ = writeln!(out, "  log level:       {}", config.log_level);
    out
}
