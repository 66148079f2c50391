//! # Regional News
//!
//! Collects regional news from a search provider, scores each article for
//! relevance to the region, and keeps both a TTL cache of recent searches and
//! an append-only history of collection snapshots.
//!
//! ## Usage
//!
//! ```sh
//! regional_news collect -q "Тула" -l 20
//! regional_news show --sort date
//! regional_news export -f csv
//! ```
//!
//! ## Architecture
//!
//! 1. **Source**: query the provider under a retry policy, validate and score entries
//! 2. **Collector**: serve from cache or fetch, then persist a snapshot and cache the result
//! 3. **Service**: dedupe, filter and order for display; statistics and exports
//! 4. **Output**: console tables and JSON/CSV/TXT export files

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tfmt, reload};

mod cache;
mod cli;
mod collector;
mod config;
mod error;
mod models;
mod outputs;
mod relevance;
mod retry;
mod service;
mod snapshots;
mod sources;
mod utils;

use cli::{Cli, Command, SortKey};
use config::AppConfig;
use models::{Article, Category};
use outputs::{ExportFormat, console};
use service::NewsService;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // Environment overrides must be in place before the config is layered.
    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    // --- Tracing init ---
    // RUST_LOG wins; otherwise start at info and switch to the configured level once loaded.
    let rust_log = EnvFilter::try_from_default_env().ok();
    let level_from_env = rust_log.is_some();
    let (filter, filter_handle) = reload::Layer::new(rust_log.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tfmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339()),
        )
        .init();

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    if let Some(level) = configured_level(level_from_env, &config) {
        if let Err(e) = filter_handle.reload(EnvFilter::new(level)) {
            warn!(error = %e, %level, "Cannot apply configured log level");
        }
    }

    let start_time = std::time::Instant::now();
    info!(app = %config.app_name, source = %config.source, "regional_news starting up");
    debug!(?args, "Parsed CLI arguments");

    if let Command::ConfigShow = args.command {
        print!("{}", console::config(&config));
        return Ok(());
    }

    if let Err(e) = ensure_writable_dir(&config.storage_path).await {
        error!(
            path = %config.storage_path.display(),
            error = %e,
            "Storage directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let service = NewsService::from_config(&config, !args.no_cache).await?;
    debug!(source = service.source_name(), "News service ready");

    if let Err(e) = run(&service, &config, args.command).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, "Execution complete");
    Ok(())
}

async fn run(service: &NewsService, config: &AppConfig, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Collect {
            query,
            limit,
            no_show,
            force_refresh,
        } => {
            let articles = service
                .collect_news(query.as_deref(), limit, force_refresh)
                .await?;
            if articles.is_empty() {
                println!("No articles found");
            } else if no_show {
                println!("Collected {} articles", articles.len());
            } else {
                print!("{}", console::articles_table("Collected news", &articles));
            }
        }
        Command::Show { limit, sort } => {
            let mut articles = service.latest_news(limit).await?;
            sort_articles(&mut articles, sort);
            print_or_empty("Latest news", &articles);
        }
        Command::Stats => {
            let stats = service.statistics().await?;
            print!("{}", console::statistics(&stats));
        }
        Command::Search {
            query,
            limit,
            min_relevance,
        } => {
            let articles = service.search_news(&query, limit, min_relevance).await?;
            print_or_empty(&format!("Search results for {query:?}"), &articles);
        }
        Command::Category { name, limit } => {
            let category: Category = name.parse()?;
            let articles = service.news_by_category(category, limit).await?;
            print_or_empty(&format!("Category {category}"), &articles);
        }
        Command::Source { name, limit } => {
            let articles = service.news_by_source(&name, limit).await?;
            print_or_empty(&format!("Source {name:?}"), &articles);
        }
        Command::Export { format, limit } => {
            let format: ExportFormat = format.parse()?;
            let path = service.export_news(format, limit).await?;
            println!("Exported to {}", path.display());
        }
        Command::ClearCache => {
            let removed = service.clear_cache().await;
            println!("Removed {removed} cache entries");
        }
        Command::CleanupCache => {
            let removed = service.cleanup_cache().await;
            println!("Removed {removed} expired cache entries");
            print!("{}", console::cache_stats(service.cache_stats().await.as_ref()));
        }
        Command::ConfigShow => print!("{}", console::config(config)),
    }
    Ok(())
}

fn print_or_empty(heading: &str, articles: &[Article]) {
    if articles.is_empty() {
        println!("No articles found");
    } else {
        print!("{}", console::articles_table(heading, articles));
    }
}

fn sort_articles(articles: &mut [Article], key: SortKey) {
    match key {
        // already relevance-ordered by the service
        SortKey::Relevance => {}
        SortKey::Date => articles.sort_by(|a, b| b.published_at().cmp(&a.published_at())),
        SortKey::Source => articles.sort_by(|a, b| a.source().cmp(b.source())),
    }
}

/// Level to switch to once the configuration is loaded; `None` keeps the RUST_LOG filter.
fn configured_level(level_from_env: bool, config: &AppConfig) -> Option<&str> {
    (!level_from_env).then_some(config.log_level.as_str())
}
