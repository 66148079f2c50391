//! Data models for collected news articles and cached result sets.
//!
//! - [`Article`]: a validated news item. It can only be obtained through
//!   [`Article::new`] or deserialization, both of which run the same checks.
//! - [`ArticleDraft`]: the unvalidated field bag an [`Article`] is built from.
//! - [`StoredArticle`]: the outcome of decoding one article from a stored
//!   file, keeping malformed records visible instead of aborting the load.
//! - [`CacheEntry`]: one cached result set for a `(query, limit)` pair.

use crate::error::ValidationError;
use crate::utils::{parse_timestamp, stable_hash};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Region assigned to articles when the caller does not name one.
pub const DEFAULT_REGION: &str = "Тульская область";

/// Topical category of an article. Serialized as its lowercase tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Politics,
    Economy,
    Society,
    Incident,
    Sport,
    Culture,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Politics,
        Category::Economy,
        Category::Society,
        Category::Incident,
        Category::Sport,
        Category::Culture,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "politics",
            Category::Economy => "economy",
            Category::Society => "society",
            Category::Incident => "incident",
            Category::Sport => "sport",
            Category::Culture => "culture",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == tag)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// Unvalidated article fields.
///
/// Optional fields start at their defaults; set them directly before
/// handing the draft to [`Article::new`].
#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: NaiveDateTime,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub category: Category,
    pub region: String,
    pub relevance_score: f64,
}

impl ArticleDraft {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        published_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            source: source.into(),
            published_at,
            content: None,
            summary: None,
            category: Category::Other,
            region: DEFAULT_REGION.to_string(),
            relevance_score: 0.0,
        }
    }
}

/// A validated news article.
///
/// Title and source are stored trimmed. Once built, an article is never
/// modified; every field is exposed through a read-only accessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArticleRecord")]
pub struct Article {
    id: String,
    title: String,
    url: String,
    source: String,
    published_at: NaiveDateTime,
    content: Option<String>,
    summary: Option<String>,
    category: Category,
    region: String,
    relevance_score: f64,
}

impl Article {
    /// Validate a draft and build the article.
    ///
    /// # Errors
    ///
    /// - title shorter than 3 characters after trimming
    /// - source shorter than 2 characters after trimming
    /// - URL without a scheme and host
    /// - relevance score outside `[0, 1]` (NaN included)
    pub fn new(draft: ArticleDraft) -> Result<Self, ValidationError> {
        let title = draft.title.trim();
        if title.chars().count() < 3 {
            return Err(ValidationError::TitleTooShort(draft.title));
        }

        let source = draft.source.trim();
        if source.chars().count() < 2 {
            return Err(ValidationError::SourceTooShort(draft.source));
        }

        match Url::parse(&draft.url) {
            Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => {}
            _ => return Err(ValidationError::InvalidUrl(draft.url)),
        }

        if !(0.0..=1.0).contains(&draft.relevance_score) {
            return Err(ValidationError::RelevanceOutOfRange(draft.relevance_score));
        }

        Ok(Self {
            id: draft.id,
            title: title.to_string(),
            url: draft.url,
            source: source.to_string(),
            published_at: draft.published_at,
            content: draft.content,
            summary: draft.summary,
            category: draft.category,
            region: draft.region,
            relevance_score: draft.relevance_score,
        })
    }

    /// Stable identifier derived from title and source name.
    pub fn id_for(title: &str, source: &str) -> String {
        stable_hash(&format!("{title}_{source}"))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn published_at(&self) -> NaiveDateTime {
        self.published_at
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn relevance_score(&self) -> f64 {
        self.relevance_score
    }
}

/// Wire shape of an article as found in snapshot and cache files.
#[derive(Debug, Deserialize)]
struct ArticleRecord {
    id: String,
    title: String,
    url: String,
    source: String,
    published_at: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    relevance_score: f64,
}

impl TryFrom<ArticleRecord> for Article {
    type Error = ValidationError;

    fn try_from(record: ArticleRecord) -> Result<Self, Self::Error> {
        let published_at = parse_timestamp(&record.published_at)
            .ok_or_else(|| ValidationError::InvalidTimestamp(record.published_at.clone()))?;
        let category = match record.category.as_deref() {
            Some(tag) => tag.parse()?,
            None => Category::Other,
        };

        Article::new(ArticleDraft {
            id: record.id,
            title: record.title,
            url: record.url,
            source: record.source,
            published_at,
            content: record.content,
            summary: record.summary,
            category,
            region: record.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            relevance_score: record.relevance_score,
        })
    }
}

/// One article decoded from a stored file.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredArticle {
    Valid(Article),
    /// The raw record failed to decode or validate.
    Malformed { raw: Value, reason: String },
}

impl StoredArticle {
    pub fn from_value(raw: Value) -> Self {
        match Article::deserialize(&raw) {
            Ok(article) => StoredArticle::Valid(article),
            Err(e) => StoredArticle::Malformed {
                raw,
                reason: e.to_string(),
            },
        }
    }

    pub fn as_article(&self) -> Option<&Article> {
        match self {
            StoredArticle::Valid(a) => Some(a),
            StoredArticle::Malformed { .. } => None,
        }
    }

    pub fn into_article(self) -> Option<Article> {
        match self {
            StoredArticle::Valid(a) => Some(a),
            StoredArticle::Malformed { .. } => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, StoredArticle::Malformed { .. })
    }
}

/// A cached result set for one `(query, limit)` pair.
///
/// Deserialization is strict: a single malformed article fails the
/// whole entry, which the cache then treats as a miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query: String,
    pub limit: usize,
    pub cached_at: NaiveDateTime,
    #[serde(default)]
    pub articles_count: usize,
    pub articles: Vec<Article>,
}

impl CacheEntry {
    pub fn new(query: &str, limit: usize, cached_at: NaiveDateTime, articles: Vec<Article>) -> Self {
        Self {
            query: query.to_string(),
            limit,
            cached_at,
            articles_count: articles.len(),
            articles,
        }
    }
}
