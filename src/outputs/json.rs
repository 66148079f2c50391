//! JSON export document.
//!
//! ```json
//! { "exported_at": "2024-03-05T10:30:00", "total_count": 2, "articles": [ ... ] }
//! ```
//!
//! Articles use the same field layout as snapshots and cache entries.

use crate::error::NewsError;
use crate::models::Article;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Serialize)]
struct ExportDocument<'a> {
    exported_at: NaiveDateTime,
    total_count: usize,
    articles: &'a [Article],
}

pub fn render(articles: &[Article], exported_at: NaiveDateTime) -> Result<String, NewsError> {
    let doc = ExportDocument {
        exported_at,
        total_count: articles.len(),
        articles,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}
