//! Google News search source.
//!
//! Queries the [Google News](https://news.google.com) RSS search feed, which
//! needs no API key and localizes results by language and country.
//!
//! # URL Pattern
//!
//! ```text
//! https://news.google.com/rss/search?q=<query>&hl=<lang>&gl=<country>&ceid=<country>:<lang>
//! ```
//!
//! Each `<item>` carries a title, link, `pubDate`, an HTML `description` and
//! a `<source url="...">Publisher</source>` element. Any of them may be
//! missing; missing values fall back to safe defaults and the resulting
//! draft is left to [`Article::new`] to accept or reject.

use super::NewsSource;
use crate::config::NewsConfig;
use crate::error::{NetworkError, NewsError, ValidationError};
use crate::models::{Article, ArticleDraft};
use crate::relevance;
use crate::retry::RetryPolicy;
use crate::utils::{now_naive, parse_timestamp, truncate_for_log};
use chrono::NaiveDateTime;
use futures::FutureExt;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SEARCH_URL: &str = "https://news.google.com/rss/search";

/// Publisher name used when an item has no `<source>`.
const UNKNOWN_SOURCE: &str = "Unknown";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text")]
    name: Option<String>,
}

/// One search result as delivered by the provider, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub source: Option<String>,
    pub published: Option<String>,
    pub summary: Option<String>,
}

impl From<Item> for RawEntry {
    fn from(item: Item) -> Self {
        Self {
            title: item.title,
            link: item.link,
            source: item.source.and_then(|s| s.name),
            published: item.pub_date,
            summary: item.description,
        }
    }
}

#[derive(Debug)]
pub struct GoogleNewsSource {
    client: reqwest::Client,
    base_url: String,
    language: String,
    country: String,
    /// Region stamped on every article this source produces.
    region: String,
    retry: RetryPolicy,
}

impl GoogleNewsSource {
    pub fn new(news: &NewsConfig, retry: RetryPolicy) -> Result<Self, NewsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(news.request_timeout_secs))
            .user_agent(news.user_agent.clone())
            .build()
            .map_err(|e| NewsError::Configuration(format!("cannot build HTTP client: {e}")))?;
        info!(language = %news.language, country = %news.country, "Google News source initialised");
        Ok(Self {
            client,
            base_url: SEARCH_URL.to_string(),
            language: news.language.clone(),
            country: news.country.clone(),
            region: news.default_region.clone(),
            retry,
        })
    }

    /// Point the source at a different search endpoint (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn search_url(&self, query: &str) -> String {
        let country = self.country.to_uppercase();
        format!(
            "{}?q={}&hl={}&gl={}&ceid={}:{}",
            self.base_url,
            urlencoding::encode(query),
            self.language,
            country,
            country,
            self.language
        )
    }

    /// One search call. Every failure comes back as a classified [`NetworkError`].
    #[instrument(level = "info", skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<RawEntry>, NewsError> {
        let url = self.search_url(query);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::classify(format!("HTTP status {status} from {url}")).into());
        }

        let body = response.text().await.map_err(|e| classify_reqwest(&e))?;
        debug!(bytes = body.len(), "Received search feed");
        Ok(parse_feed(&body)?)
    }
}

impl NewsSource for GoogleNewsSource {
    fn name(&self) -> &'static str {
        "google"
    }

    fn fetch<'a>(&'a self, query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<Article>, NewsError>> {
        async move {
            info!(%query, limit, "Searching Google News");
            let entries = self.retry.run(|| self.search(query)).await?;
            let articles = build_articles(entries, query, limit, &self.region);
            info!(count = articles.len(), %query, "Google News search finished");
            Ok(articles)
        }
        .boxed()
    }
}

/// Parse an RSS 2.0 document into raw entries.
pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>, NetworkError> {
    let rss: Rss = quick_xml::de::from_str(xml).map_err(|e| {
        NetworkError::Generic(format!(
            "malformed RSS response ({e}): {}",
            truncate_for_log(xml, 200)
        ))
    })?;
    Ok(rss.channel.items.into_iter().map(RawEntry::from).collect())
}

/// Turn the first `limit` raw entries into scored articles, skipping invalid ones.
pub fn build_articles(entries: Vec<RawEntry>, query: &str, limit: usize, region: &str) -> Vec<Article> {
    entries
        .into_iter()
        .take(limit)
        .enumerate()
        .filter_map(|(index, entry)| match entry_to_article(entry, query, region) {
            Ok(article) => {
                debug!(index, title = %truncate_for_log(article.title(), 50), "Accepted article");
                Some(article)
            }
            Err(e) => {
                warn!(index, error = %e, "Skipping invalid search entry");
                None
            }
        })
        .collect()
}

fn entry_to_article(entry: RawEntry, query: &str, region: &str) -> Result<Article, ValidationError> {
    let title = entry.title.unwrap_or_default();
    let source = entry
        .source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
    let summary = entry
        .summary
        .as_deref()
        .map(strip_html)
        .filter(|s| !s.is_empty());
    let relevance_score = relevance::score(&title, summary.as_deref().unwrap_or_default(), query);

    let mut draft = ArticleDraft::new(
        Article::id_for(&title, &source),
        title,
        entry.link.unwrap_or_default(),
        source,
        parse_published(entry.published.as_deref()),
    );
    draft.summary = summary;
    draft.region = region.to_string();
    draft.relevance_score = relevance_score;
    Article::new(draft)
}

/// Best-effort publication date; unparseable or missing input becomes "now".
pub fn parse_published(raw: Option<&str>) -> NaiveDateTime {
    match raw.and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            if let Some(raw) = raw {
                warn!(raw = %raw, "Unparseable publication date; using current time");
            }
            now_naive()
        }
    }
}

/// Reduce an HTML fragment to its visible text with collapsed whitespace.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn classify_reqwest(e: &reqwest::Error) -> NetworkError {
    let message = error_chain(e);
    if e.is_timeout() {
        NetworkError::Timeout(message)
    } else if e.is_connect() {
        NetworkError::Connection(message)
    } else {
        NetworkError::classify(message)
    }
}

/// Render an error and all of its sources on one line.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
