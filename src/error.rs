//! Error taxonomy for the collection pipeline.
//!
//! - [`ValidationError`]: a single article failed its construction checks.
//!   Fatal for that entry, never for a whole batch.
//! - [`NetworkError`]: the search provider could not be reached or answered
//!   with garbage. These are the errors the retry policy acts on.
//! - [`NewsError`]: the umbrella type returned by the pipeline, plus a
//!   coarse [`ErrorKind`] used to decide retryability.

use thiserror::Error;

/// Reasons an [`Article`](crate::models::Article) refuses to be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("title must contain at least 3 characters, got {0:?}")]
    TitleTooShort(String),

    #[error("source must contain at least 2 characters, got {0:?}")]
    SourceTooShort(String),

    #[error("invalid URL {0:?}: expected scheme and host")]
    InvalidUrl(String),

    #[error("relevance score must be within [0, 1], got {0}")]
    RelevanceOutOfRange(f64),

    #[error("unparseable timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("unknown category {0:?}")]
    UnknownCategory(String),
}

/// Provider-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("network error: {0}")]
    Generic(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

impl NetworkError {
    /// Classify a failure message by the fragments it contains.
    ///
    /// Timeout fragments win over connection fragments, so
    /// `"connection timeout"` is a [`NetworkError::Timeout`].
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            NetworkError::Timeout(message)
        } else if lower.contains("connection") || lower.contains("network") {
            NetworkError::Connection(message)
        } else {
            NetworkError::Generic(message)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NetworkError::Generic(_) => ErrorKind::Network,
            NetworkError::Timeout(_) => ErrorKind::Timeout,
            NetworkError::Connection(_) => ErrorKind::Connection,
        }
    }
}

/// Coarse classification of a [`NewsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Network,
    Timeout,
    Connection,
    Cache,
    Configuration,
    Io,
    Serialization,
}

impl ErrorKind {
    /// The kinds a network retry policy retries on.
    pub const NETWORK: [ErrorKind; 3] = [ErrorKind::Network, ErrorKind::Timeout, ErrorKind::Connection];
}

#[derive(Debug, Error)]
pub enum NewsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NewsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NewsError::Validation(_) => ErrorKind::Validation,
            NewsError::Network(e) => e.kind(),
            NewsError::Cache(_) => ErrorKind::Cache,
            NewsError::Configuration(_) => ErrorKind::Configuration,
            NewsError::Io(_) => ErrorKind::Io,
            NewsError::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_timeout() {
        let e = NetworkError::classify("operation Timeout after 30s");
        assert!(matches!(e, NetworkError::Timeout(_)));
        let e = NetworkError::classify("request timed out");
        assert!(matches!(e, NetworkError::Timeout(_)));
    }

    #[test]
    fn test_classify_connection() {
        assert!(matches!(
            NetworkError::classify("Connection refused"),
            NetworkError::Connection(_)
        ));
        assert!(matches!(
            NetworkError::classify("network unreachable"),
            NetworkError::Connection(_)
        ));
    }

    #[test]
    fn test_classify_timeout_beats_connection() {
        assert!(matches!(
            NetworkError::classify("connection timeout"),
            NetworkError::Timeout(_)
        ));
    }

    #[test]
    fn test_classify_generic_keeps_message() {
        let e = NetworkError::classify("HTTP status 503");
        assert_eq!(e, NetworkError::Generic("HTTP status 503".to_string()));
        assert_eq!(e.to_string(), "network error: HTTP status 503");
    }

    #[test]
    fn test_news_error_kind() {
        let e: NewsError = NetworkError::Timeout("slow".into()).into();
        assert_eq!(e.kind(), ErrorKind::Timeout);
        let e: NewsError = ValidationError::TitleTooShort("ab".into()).into();
        assert_eq!(e.kind(), ErrorKind::Validation);
        assert_eq!(NewsError::Configuration("x".into()).kind(), ErrorKind::Configuration);
    }
}
