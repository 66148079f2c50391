//! Utility functions for hashing, timestamps, string handling and file system checks.
//!
//! - Stable content hashes for article ids and cache keys
//! - Best-effort timestamp parsing into timezone-naive values
//! - String truncation for logs and console tables
//! - File system validation for storage directories

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Layouts tried, in order, for timestamps without an offset.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%a, %d %b %Y %H:%M:%S",
];

/// Layouts tried, in order, for timestamps carrying an offset.
const OFFSET_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f %z"];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Hex-encoded SHA-256 of `text`.
pub fn stable_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Current local wall-clock time without an offset.
pub fn now_naive() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parse a timestamp in any of the layouts the provider and stored files use.
///
/// Offsets are dropped and the wall-clock time is kept as written, so
/// `"2024-03-05T10:15:00+03:00"` becomes `2024-03-05T10:15:00`. Date-only
/// input maps to midnight.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Some(dt.naive_local());
        }
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    // RFC 2822 with a zone name chrono does not know ("... GMT+3").
    if let Some((head, _zone)) = s.rsplit_once(' ') {
        if let Ok(dt) = NaiveDateTime::parse_from_str(head, "%a, %d %b %Y %H:%M:%S") {
            return Some(dt);
        }
    }
    None
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the
/// number of dropped bytes appended. Cuts always land on a char boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Shorten `s` to at most `max` characters, ending in `...` when cut.
pub fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Storage directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("Тульская область", 4);
        assert!(result.starts_with("Туль…"));
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("short", 10), "short");
        assert_eq!(ellipsize("Тульская область", 8), "Тульс...");
        assert_eq!(ellipsize("Тульская область", 8).chars().count(), 8);
    }

    #[test]
    fn test_stable_hash() {
        assert_eq!(stable_hash("Тула_10"), stable_hash("Тула_10"));
        assert_ne!(stable_hash("Тула_10"), stable_hash("Тула_20"));
        assert_eq!(stable_hash("x").len(), 64);
    }

    #[test]
    fn test_parse_rfc2822_keeps_wall_clock() {
        let dt = parse_timestamp("Tue, 05 Mar 2024 10:15:00 +0300").unwrap();
        assert_eq!(dt.to_string(), "2024-03-05 10:15:00");
        let dt = parse_timestamp("Tue, 05 Mar 2024 07:15:00 GMT").unwrap();
        assert_eq!(dt.hour(), 7);
    }

    #[test]
    fn test_parse_iso_variants() {
        assert_eq!(
            parse_timestamp("2024-03-05T10:15:00.123456").unwrap().to_string(),
            "2024-03-05 10:15:00.123456"
        );
        assert_eq!(
            parse_timestamp("2024-03-05T10:15:00Z").unwrap().to_string(),
            "2024-03-05 10:15:00"
        );
        assert_eq!(
            parse_timestamp("2024-03-05 10:15:00+03:00").unwrap().to_string(),
            "2024-03-05 10:15:00"
        );
        assert_eq!(
            parse_timestamp("05.03.2024").unwrap().to_string(),
            "2024-03-05 00:00:00"
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("вчера").is_none());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
