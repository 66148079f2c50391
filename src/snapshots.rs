//! On-disk history of collection runs.
//!
//! Each successful, non-empty collection writes one immutable snapshot:
//!
//! ```text
//! storage_path/
//! ├── news_20240305_101500_123456.json
//! └── news_20240305_111502_654321.json   <- latest
//! ```
//!
//! File names embed a microsecond timestamp, so lexicographic order is
//! chronological order and the last name is the latest snapshot. Loading is
//! best-effort per article: a record that fails validation is kept as
//! [`StoredArticle::Malformed`] instead of aborting the load.

use crate::error::NewsError;
use crate::models::{Article, StoredArticle};
use crate::utils::{now_naive, parse_timestamp};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

const FILE_PREFIX: &str = "news_";
const FILE_SUFFIX: &str = ".json";

#[derive(Serialize)]
struct SnapshotOut<'a> {
    collected_at: NaiveDateTime,
    query: &'a str,
    total_count: usize,
    articles: &'a [Article],
}

#[derive(Deserialize)]
struct SnapshotIn {
    #[serde(default)]
    collected_at: Option<String>,
    #[serde(default)]
    query: String,
    #[serde(default)]
    total_count: usize,
    articles: Vec<Value>,
}

/// A snapshot read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: PathBuf,
    pub collected_at: Option<NaiveDateTime>,
    pub query: String,
    pub total_count: usize,
    pub articles: Vec<StoredArticle>,
}

impl Snapshot {
    pub fn malformed_count(&self) -> usize {
        self.articles.iter().filter(|a| a.is_malformed()).count()
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name_for(at: NaiveDateTime) -> String {
        format!("{FILE_PREFIX}{}{FILE_SUFFIX}", at.format("%Y%m%d_%H%M%S_%6f"))
    }

    /// Write a new snapshot for `query`. Never overwrites an existing file.
    #[instrument(level = "info", skip(self, articles), fields(count = articles.len()))]
    pub async fn write(&self, query: &str, articles: &[Article]) -> Result<PathBuf, NewsError> {
        let mut at = now_naive();
        let body = SnapshotOut {
            collected_at: at,
            query,
            total_count: articles.len(),
            articles,
        };
        let json = serde_json::to_vec_pretty(&body)?;

        loop {
            let path = self.dir.join(Self::file_name_for(at));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&json).await?;
                    file.flush().await?;
                    info!(path = %path.display(), "Wrote snapshot");
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Snapshot name taken; bumping timestamp");
                    at += TimeDelta::microseconds(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Snapshot files, oldest first.
    pub async fn list(&self) -> Result<Vec<PathBuf>, NewsError> {
        let mut paths = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(paths),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    pub async fn read(&self, path: &Path) -> Result<Snapshot, NewsError> {
        let bytes = fs::read(path).await?;
        let raw: SnapshotIn = serde_json::from_slice(&bytes)?;
        let articles: Vec<StoredArticle> = raw.articles.into_iter().map(StoredArticle::from_value).collect();

        for (index, stored) in articles.iter().enumerate() {
            if let StoredArticle::Malformed { reason, .. } = stored {
                warn!(path = %path.display(), index, %reason, "Malformed article in snapshot");
            }
        }

        Ok(Snapshot {
            path: path.to_path_buf(),
            collected_at: raw.collected_at.as_deref().and_then(parse_timestamp),
            query: raw.query,
            total_count: raw.total_count,
            articles,
        })
    }

    /// The most recent snapshot, or `None` when nothing was collected yet.
    #[instrument(level = "info", skip(self))]
    pub async fn load_latest(&self) -> Result<Option<Snapshot>, NewsError> {
        let Some(latest) = self.list().await?.pop() else {
            warn!(dir = %self.dir.display(), "No saved snapshots");
            return Ok(None);
        };
        info!(path = %latest.display(), "Loading latest snapshot");
        self.read(&latest).await.map(Some)
    }
}
