//! Rendering collected articles for people and for other programs.
//!
//! # Submodules
//!
//! - [`json`]: JSON export document
//! - [`csv`]: spreadsheet-friendly export
//! - [`text`]: numbered plain-text listing
//! - [`console`]: terminal tables for the CLI
//!
//! # Output Structure
//!
//! Exports land next to the snapshots, one file per invocation:
//!
//! ```text
//! storage_path/
//! ├── news_20240305_101500_123456.json   # snapshot (collector)
//! ├── export_20240305_103000.csv
//! └── export_20240305_103012.json
//! ```

use crate::error::NewsError;
use crate::models::Article;
use chrono::NaiveDateTime;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{info, instrument};

pub mod console;
pub mod csv;
pub mod json;
pub mod text;

/// File formats accepted by `export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn render(&self, articles: &[Article], exported_at: NaiveDateTime) -> Result<String, NewsError> {
        match self {
            ExportFormat::Json => json::render(articles, exported_at),
            ExportFormat::Csv => Ok(csv::render(articles)),
            ExportFormat::Txt => Ok(text::render(articles, exported_at)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "txt" | "text" => Ok(ExportFormat::Txt),
            other => Err(NewsError::Configuration(format!(
                "unsupported export format {other:?}; expected json, csv or txt"
            ))),
        }
    }
}

pub fn export_file_name(format: ExportFormat, at: NaiveDateTime) -> String {
    format!("export_{}.{}", at.format("%Y%m%d_%H%M%S"), format.extension())
}

/// Render `articles` in `format` and write them under `dir`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %format, count = articles.len()))]
pub async fn write_export(
    dir: &Path,
    format: ExportFormat,
    articles: &[Article],
    at: NaiveDateTime,
) -> Result<PathBuf, NewsError> {
    let body = format.render(articles, at)?;
    fs::create_dir_all(dir).await?;
    let path = dir.join(export_file_name(format, at));
    fs::write(&path, body).await?;
    info!(path = %path.display(), "Wrote export");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{article, ts};

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Txt);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(NewsError::Configuration(_))
        ));
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(ExportFormat::Csv, ts(2024, 3, 5, 10)),
            "export_20240305_100000.csv"
        );
    }

    #[tokio::test]
    async fn test_write_export() {
        let tmp = tempfile::tempdir().unwrap();
        let articles = vec![article("Тула: новости дня", "ТСН", 0.7, ts(2024, 3, 1, 10))];
        let path = write_export(tmp.path(), ExportFormat::Txt, &articles, ts(2024, 3, 5, 10))
            .await
            .unwrap();
        assert_eq!(path, tmp.path().join("export_20240305_100000.txt"));
        let body = fs::read_to_string(&path).await.unwrap();
        assert!(body.contains("Тула: новости дня"));
    }
}
