//! Domain Events
//!
//! Immutable records of cache lifecycle transitions, used for audit logging
//! and for observing the cache in tests.
//!
//! # Example
//!
//! ```ignore
//! let event = DomainEvent::cache_cleared("books");
//! event_publisher.publish(event).await?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Domain event representing a significant occurrence in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A refresh completed and its entry was installed.
    CacheRefreshed {
        collection: String,
        records: usize,
        pages: usize,
        captured_at: DateTime<Utc>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A refresh completed but a concurrent clear discarded its entry.
    CacheRefreshDiscarded {
        collection: String,
        records: usize,
        timestamp: DateTime<Utc>,
    },

    /// A refresh failed; the previous entry (if any) is untouched.
    CacheRefreshFailed {
        collection: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Pagination stopped at the page ceiling while the source still had more.
    PaginationCapped {
        collection: String,
        pages: usize,
        timestamp: DateTime<Utc>,
    },

    /// The entry was cleared by an administrative reset.
    CacheCleared {
        collection: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Get the event timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::CacheRefreshed { timestamp, .. }
            | DomainEvent::CacheRefreshDiscarded { timestamp, .. }
            | DomainEvent::CacheRefreshFailed { timestamp, .. }
            | DomainEvent::PaginationCapped { timestamp, .. }
            | DomainEvent::CacheCleared { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::CacheRefreshed { .. } => "CacheRefreshed",
            DomainEvent::CacheRefreshDiscarded { .. } => "CacheRefreshDiscarded",
            DomainEvent::CacheRefreshFailed { .. } => "CacheRefreshFailed",
            DomainEvent::PaginationCapped { .. } => "PaginationCapped",
            DomainEvent::CacheCleared { .. } => "CacheCleared",
        }
    }

    /// Get the collection the event concerns.
    pub fn collection(&self) -> &str {
        match self {
            DomainEvent::CacheRefreshed { collection, .. }
            | DomainEvent::CacheRefreshDiscarded { collection, .. }
            | DomainEvent::CacheRefreshFailed { collection, .. }
            | DomainEvent::PaginationCapped { collection, .. }
            | DomainEvent::CacheCleared { collection, .. } => collection,
        }
    }
}

// =============================================================================
// Event Builders
// =============================================================================

impl DomainEvent {
    pub fn cache_refreshed(
        collection: impl Into<String>,
        records: usize,
        pages: usize,
        captured_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        DomainEvent::CacheRefreshed {
            collection: collection.into(),
            records,
            pages,
            captured_at,
            duration_ms: duration.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    pub fn cache_refresh_discarded(collection: impl Into<String>, records: usize) -> Self {
        DomainEvent::CacheRefreshDiscarded {
            collection: collection.into(),
            records,
            timestamp: Utc::now(),
        }
    }

    pub fn cache_refresh_failed(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainEvent::CacheRefreshFailed {
            collection: collection.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn pagination_capped(collection: impl Into<String>, pages: usize) -> Self {
        DomainEvent::PaginationCapped {
            collection: collection.into(),
            pages,
            timestamp: Utc::now(),
        }
    }

    pub fn cache_cleared(collection: impl Into<String>) -> Self {
        DomainEvent::CacheCleared {
            collection: collection.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = DomainEvent::cache_refreshed(
            "books",
            12,
            2,
            Utc::now(),
            Duration::from_millis(340),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"CacheRefreshed\""));
        assert!(json.contains("\"records\":12"));
        assert!(json.contains("\"duration_ms\":340"));

        let parsed: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), "CacheRefreshed");
    }

    #[test]
    fn test_event_type_and_collection() {
        let events = [
            DomainEvent::cache_cleared("books"),
            DomainEvent::cache_refresh_failed("books", "boom"),
            DomainEvent::pagination_capped("recipe_tags", 2),
            DomainEvent::cache_refresh_discarded("recipe_tags", 4),
        ];

        assert_eq!(events[0].event_type(), "CacheCleared");
        assert_eq!(events[1].event_type(), "CacheRefreshFailed");
        assert_eq!(events[2].event_type(), "PaginationCapped");
        assert_eq!(events[3].event_type(), "CacheRefreshDiscarded");
        assert_eq!(events[2].collection(), "recipe_tags");
    }

    #[test]
    fn test_timestamp() {
        let before = Utc::now();
        let event = DomainEvent::cache_cleared("books");
        let after = Utc::now();

        assert!(event.timestamp() >= before);
        assert!(event.timestamp() <= after);
    }
}
