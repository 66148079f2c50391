//! Command-line interface definitions.
//!
//! Global options choose where configuration comes from; each subcommand maps
//! onto one [`NewsService`](crate::service::NewsService) operation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for the regional news collector.
///
/// # Examples
///
/// ```sh
/// # Collect with the configured defaults
/// regional_news collect
///
/// # Search, bypassing the cache
/// regional_news --no-cache search "Тула транспорт" -l 5 --min-relevance 0.3
///
/// # Export the latest snapshot as CSV
/// regional_news --config config.yaml export -f csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, global = true, env = "NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Load environment overrides from this file instead of `.env`
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Disable the result cache for this run
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch news from the configured source
    Collect {
        /// Search query (defaults to the configured region)
        #[arg(short, long)]
        query: Option<String>,
        /// Maximum number of articles
        #[arg(short, long)]
        limit: Option<usize>,
        /// Do not print the collected articles
        #[arg(long)]
        no_show: bool,
        /// Ignore cached results
        #[arg(long)]
        force_refresh: bool,
    },
    /// Show articles from the latest snapshot
    Show {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = SortKey::Relevance)]
        sort: SortKey,
    },
    /// Summarise the latest snapshot
    Stats,
    /// Search news by query
    Search {
        query: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0.0)]
        min_relevance: f64,
    },
    /// Articles of one category from the latest snapshot
    Category {
        name: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Articles whose source name contains the given text
    Source {
        name: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Write the latest articles to a file
    Export {
        /// json, csv or txt
        #[arg(short, long, default_value = "json")]
        format: String,
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Remove every cache entry
    ClearCache,
    /// Remove expired cache entries
    CleanupCache,
    /// Print the effective configuration
    ConfigShow,
}

/// Ordering for `show`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Relevance,
    Source,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "regional_news",
            "--config",
            "./config.yaml",
            "collect",
            "--query",
            "Новомосковск",
            "--limit",
            "5",
            "--force-refresh",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("./config.yaml")));
        assert!(!cli.no_cache);
        assert_eq!(
            cli.command,
            Command::Collect {
                query: Some("Новомосковск".into()),
                limit: Some(5),
                no_show: false,
                force_refresh: true,
            }
        );
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["regional_news", "search", "Тула", "-l", "3", "--no-cache"]);

        assert!(cli.no_cache);
        assert_eq!(
            cli.command,
            Command::Search {
                query: "Тула".into(),
                limit: 3,
                min_relevance: 0.0,
            }
        );
    }

    #[test]
    fn test_show_defaults_and_sort() {
        let cli = Cli::parse_from(["regional_news", "show"]);
        assert_eq!(
            cli.command,
            Command::Show {
                limit: 10,
                sort: SortKey::Relevance
            }
        );

        let cli = Cli::parse_from(["regional_news", "show", "--sort", "date"]);
        assert!(matches!(cli.command, Command::Show { sort: SortKey::Date, .. }));
        assert!(Cli::try_parse_from(["regional_news", "show", "--sort", "title"]).is_err());
    }

    #[test]
    fn test_kebab_case_subcommands() {
        let cli = Cli::parse_from(["regional_news", "clear-cache"]);
        assert_eq!(cli.command, Command::ClearCache);
        let cli = Cli::parse_from(["regional_news", "config-show"]);
        assert_eq!(cli.command, Command::ConfigShow);
    }
}
