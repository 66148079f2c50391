//! Numbered plain-text listing.

use crate::models::Article;
use chrono::NaiveDateTime;
use std::fmt::Write;

pub fn render(articles: &[Article], exported_at: NaiveDateTime) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "News export {}", exported_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Total articles: {}", articles.len());
    out.push('\n');

    for (i, a) in articles.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, a.title());
        let _ = writeln!(out, "   Source: {}", a.source());
        let _ = writeln!(out, "   Published: {}", a.published_at().format("%Y-%m-%d %H:%M"));
        let _ = writeln!(out, "   Category: {}", a.category());
        let _ = writeln!(out, "   Relevance: {:.2}", a.relevance_score());
        let _ = writeln!(out, "   URL: {}", a.url());
        if let Some(body) = a.summary().or(a.content()) {
            let _ = writeln!(out, "   {body}");
        }
        out.push('\n');
    }
    out
}
