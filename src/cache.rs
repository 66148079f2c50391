//! File-backed, TTL-bounded cache of search results.
//!
//! One JSON file per `(query, limit)` pair, named `cache_<hash>.json` where
//! the hash is a SHA-256 over `"{query}_{limit}"`. Nothing is kept in
//! memory: every call re-reads the directory, so the cache survives
//! restarts and freshness is always judged against the current clock.
//!
//! Cache failures never escape this module. An unreadable or corrupt entry
//! is a miss, a failed write is logged and dropped.

use crate::error::NewsError;
use crate::models::{Article, CacheEntry};
use crate::utils::{now_naive, stable_hash};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

const FILE_PREFIX: &str = "cache_";
const FILE_SUFFIX: &str = ".json";

/// Snapshot of the cache directory, computed by scanning every entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_files: usize,
    pub valid_files: usize,
    pub expired_files: usize,
    pub total_size_bytes: u64,
    pub cache_dir: PathBuf,
    pub ttl_hours: f64,
}

/// Only the timestamp, for freshness checks that skip decoding articles.
#[derive(Debug, Deserialize)]
struct EntryStamp {
    cached_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewsCache {
    dir: PathBuf,
    ttl: TimeDelta,
}

impl NewsCache {
    /// Open (creating if needed) the cache directory.
    pub async fn open(dir: impl Into<PathBuf>, ttl: TimeDelta) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), ttl_secs = ttl.num_seconds(), "Cache initialised");
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic key for a `(query, limit)` pair.
    pub fn key(query: &str, limit: usize) -> String {
        stable_hash(&format!("{query}_{limit}"))
    }

    fn path_for(&self, query: &str, limit: usize) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", Self::key(query, limit)))
    }

    fn is_fresh(&self, cached_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        now - cached_at < self.ttl
    }

    /// Read and decode the entry at `path`; `Ok(None)` when there is none.
    async fn read_entry(path: &Path) -> Result<Option<CacheEntry>, NewsError> {
        let bytes = match fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(NewsError::Cache(format!("unreadable entry {}: {e}", path.display()))),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| NewsError::Cache(format!("corrupt entry {}: {e}", path.display())))
    }

    /// Cached articles for `(query, limit)`, or `None` when absent, expired or unreadable.
    #[instrument(level = "info", skip(self))]
    pub async fn get(&self, query: &str, limit: usize) -> Option<Vec<Article>> {
        let entry = match Self::read_entry(&self.path_for(query, limit)).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("Cache miss: no entry");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Treating cache entry as miss");
                return None;
            }
        };

        if !self.is_fresh(entry.cached_at, now_naive()) {
            debug!(cached_at = %entry.cached_at, "Cache miss: entry expired");
            return None;
        }

        info!(count = entry.articles.len(), "Loaded articles from cache");
        Some(entry.articles)
    }

    /// Store `articles` for `(query, limit)`, replacing any previous entry.
    /// Empty result sets are never cached.
    #[instrument(level = "info", skip(self, articles), fields(count = articles.len()))]
    pub async fn put(&self, query: &str, limit: usize, articles: &[Article]) {
        if articles.is_empty() {
            debug!("No articles to cache");
            return;
        }

        let path = self.path_for(query, limit);
        let entry = CacheEntry::new(query, limit, now_naive(), articles.to_vec());
        let json = match serde_json::to_vec_pretty(&entry) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        match fs::write(&path, json).await {
            Ok(()) => info!(path = %path.display(), "Stored articles in cache"),
            Err(e) => error!(path = %path.display(), error = %e, "Failed to write cache entry"),
        }
    }

    /// Remove every cache entry. Returns the number of files removed.
    #[instrument(level = "info", skip(self))]
    pub async fn clear(&self) -> usize {
        let mut removed = 0;
        for path in self.entry_paths().await {
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache entry"),
            }
        }
        info!(removed, "Cache cleared");
        removed
    }

    /// Remove entries whose TTL has elapsed (unreadable entries count as expired).
    #[instrument(level = "info", skip(self))]
    pub async fn cleanup_expired(&self) -> usize {
        let now = now_naive();
        let mut removed = 0;
        for path in self.entry_paths().await {
            if self.entry_is_fresh(&path, now).await {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove expired cache entry"),
            }
        }
        if removed > 0 {
            info!(removed, "Removed expired cache entries");
        }
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let now = now_naive();
        let paths = self.entry_paths().await;
        let mut valid_files = 0;
        let mut total_size_bytes = 0;
        for path in &paths {
            if let Ok(meta) = fs::metadata(path).await {
                total_size_bytes += meta.len();
            }
            if self.entry_is_fresh(path, now).await {
                valid_files += 1;
            }
        }

        CacheStats {
            total_files: paths.len(),
            valid_files,
            expired_files: paths.len() - valid_files,
            total_size_bytes,
            cache_dir: self.dir.clone(),
            ttl_hours: self.ttl.num_seconds() as f64 / 3600.0,
        }
    }

    async fn entry_is_fresh(&self, path: &Path, now: NaiveDateTime) -> bool {
        let Ok(bytes) = fs::read(path).await else {
            return false;
        };
        match serde_json::from_slice::<EntryStamp>(&bytes) {
            Ok(stamp) => self.is_fresh(stamp.cached_at, now),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cache entry has no readable timestamp");
                false
            }
        }
    }

    /// Paths of all cache entry files, sorted by name.
    async fn entry_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot list cache directory");
                return paths;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        paths
    }
}
