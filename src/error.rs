//! Error types for Notion Shelf

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-facing classification of an [`Error`].
///
/// The serving layer only needs to distinguish these four outcomes; the
/// individual variants carry the detail for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The upstream data source could not be read (network, auth, rate limit, timeout)
    SourceUnavailable,
    /// A raw record was missing a required field or had an unexpected shape
    Validation,
    /// A by-id lookup found nothing
    NotFound,
    /// Anything else (configuration, I/O, bugs)
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::SourceUnavailable => write!(f, "source_unavailable"),
            ErrorKind::Validation => write!(f, "validation_error"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Errors that can occur in Notion Shelf
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Upstream Source Errors
    // =========================================================================
    /// Transport-level failure talking to Notion
    #[error("Notion connection error: {0}")]
    SourceConnection(#[source] reqwest::Error),

    /// Notion answered with a non-success status
    #[error("Notion returned status {status}: {message}")]
    SourceStatus { status: u16, message: String },

    /// Notion answered with a body we could not decode
    #[error("Failed to parse Notion response: {0}")]
    SourceResponseParse(String),

    /// A single page fetch exceeded the configured timeout
    #[error("Page fetch for {collection} timed out after {timeout:?}")]
    SourceTimeout {
        collection: String,
        timeout: Duration,
    },

    /// Generic upstream failure (used by non-HTTP sources)
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    // =========================================================================
    // Record Errors
    // =========================================================================
    /// A raw record could not be normalized
    #[error("Invalid {collection} record {record_id}: {reason}")]
    Validation {
        collection: String,
        record_id: String,
        reason: String,
    },

    /// No entity with the given id
    #[error("{collection} not found: {id}")]
    NotFound { collection: String, id: String },

    // =========================================================================
    // Process Errors
    // =========================================================================
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a validation error for one record.
    pub fn validation(
        collection: impl Into<String>,
        record_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Validation {
            collection: collection.into(),
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }

    /// Build a not-found error.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Classify this error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SourceConnection(_)
            | Error::SourceStatus { .. }
            | Error::SourceResponseParse(_)
            | Error::SourceTimeout { .. }
            | Error::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for by-id misses, which are a normal outcome rather than a fault.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_errors_classify_as_unavailable() {
        let errors = [
            Error::SourceStatus {
                status: 429,
                message: "rate limited".into(),
            },
            Error::SourceResponseParse("eof".into()),
            Error::SourceTimeout {
                collection: "books".into(),
                timeout: Duration::from_secs(1),
            },
            Error::SourceUnavailable("down".into()),
        ];

        for error in errors {
            assert_eq!(error.kind(), ErrorKind::SourceUnavailable, "{}", error);
        }
    }

    #[test]
    fn test_validation_and_not_found_kinds() {
        let err = Error::validation("books", "page-1", "missing Title");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Invalid books record page-1: missing Title");

        let err = Error::not_found("recipe_tags", "tag-9");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "recipe_tags not found: tag-9");
    }

    #[test]
    fn test_process_errors_are_internal() {
        assert_eq!(Error::Config("x".into()).kind(), ErrorKind::Internal);
        assert_eq!(Error::Internal("x".into()).kind(), ErrorKind::Internal);
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy");
        assert_eq!(Error::from(io).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::SourceUnavailable.to_string(), "source_unavailable");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
