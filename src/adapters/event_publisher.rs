//! Event Publishers
//!
//! `EventPublisher` implementations for cache lifecycle events: a tracing
//! audit log for the running service and an in-memory collector that tests
//! assert against.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::{DomainEvent, EventPublisher};
use crate::error::Result;

/// Writes each event as a structured `debug` record under the
/// `notion_shelf::events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        match &event {
            DomainEvent::CacheRefreshed {
                collection,
                records,
                pages,
                captured_at,
                duration_ms,
                ..
            } => debug!(
                target: "notion_shelf::events",
                collection = %collection,
                records,
                pages,
                captured_at = %captured_at,
                duration_ms,
                "CacheRefreshed"
            ),
            DomainEvent::CacheRefreshDiscarded {
                collection,
                records,
                ..
            } => debug!(
                target: "notion_shelf::events",
                collection = %collection,
                records,
                "CacheRefreshDiscarded"
            ),
            DomainEvent::CacheRefreshFailed {
                collection, reason, ..
            } => debug!(
                target: "notion_shelf::events",
                collection = %collection,
                reason = %reason,
                "CacheRefreshFailed"
            ),
            DomainEvent::PaginationCapped {
                collection, pages, ..
            } => debug!(
                target: "notion_shelf::events",
                collection = %collection,
                pages,
                "PaginationCapped"
            ),
            DomainEvent::CacheCleared { collection, .. } => debug!(
                target: "notion_shelf::events",
                collection = %collection,
                "CacheCleared"
            ),
        }
        Ok(())
    }
}

/// Keeps every published event, in publish order.
#[derive(Debug, Default)]
pub struct InMemoryEventCollector {
    events: Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Events whose [`DomainEvent::event_type`] is `event_type`.
    pub fn events_of_type(&self, event_type: &str) -> Vec<DomainEvent> {
        self.filtered(|e| e.event_type() == event_type)
    }

    /// Events concerning one collection.
    pub fn events_for(&self, collection: &str) -> Vec<DomainEvent> {
        self.filtered(|e| e.collection() == collection)
    }

    fn filtered(&self, keep: impl Fn(&DomainEvent) -> bool) -> Vec<DomainEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventCollector {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_logging_publisher_accepts_every_event() {
        let publisher = LoggingEventPublisher::new();
        let events = vec![
            DomainEvent::cache_refreshed("books", 12, 2, Utc::now(), Duration::from_millis(40)),
            DomainEvent::cache_refresh_discarded("books", 12),
            DomainEvent::cache_refresh_failed("books", "rate limited"),
            DomainEvent::pagination_capped("recipe_tags", 2),
            DomainEvent::cache_cleared("books"),
        ];

        publisher.publish_all(events).await.unwrap();
    }

    #[tokio::test]
    async fn test_collector_filters() {
        let collector = InMemoryEventCollector::new();
        assert!(collector.is_empty());

        collector
            .publish_all(vec![
                DomainEvent::cache_cleared("books"),
                DomainEvent::pagination_capped("books", 3),
                DomainEvent::cache_cleared("recipe_tags"),
            ])
            .await
            .unwrap();

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.events_of_type("CacheCleared").len(), 2);
        assert_eq!(collector.events_for("books").len(), 2);
        assert_eq!(collector.events()[1].event_type(), "PaginationCapped");

        collector.clear();
        assert!(collector.is_empty());
    }
}
