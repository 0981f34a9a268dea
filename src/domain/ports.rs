//! Domain Ports (Port/Adapter Pattern)
//!
//! The abstractions the cache depends on. Adapters in [`crate::adapters`]
//! implement them; the normalizers in [`crate::normalize`] implement
//! [`Collection`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │   PageSource │ Collection │ EventPublisher           │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  NotionClient │ InMemoryPageSource │ LoggingEventPublisher   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;

use super::events::DomainEvent;
use crate::error::Result;

// =============================================================================
// Upstream Source Port
// =============================================================================

/// An un-normalized record exactly as the upstream source returned it.
pub type RawRecord = serde_json::Value;

/// One page of a paged upstream query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub records: Vec<RawRecord>,
    /// The source claims more pages exist
    pub has_more: bool,
    /// Continuation token for the next page
    pub next_cursor: Option<String>,
}

impl RawPage {
    /// A final page holding `records`.
    pub fn last(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            has_more: false,
            next_cursor: None,
        }
    }

    /// A page followed by another page at `cursor`.
    pub fn more(records: Vec<RawRecord>, cursor: impl Into<String>) -> Self {
        Self {
            records,
            has_more: true,
            next_cursor: Some(cursor.into()),
        }
    }
}

/// Port for the external paged data source.
///
/// Implementations do not retry; the first failure is returned as-is.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page of `collection_id`, starting at `cursor` (or the beginning).
    async fn query(
        &self,
        collection_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<RawPage>;

    /// Fetch a single record by id, bypassing pagination.
    async fn retrieve(&self, id: &str) -> Result<RawRecord>;

    /// Check if the source is reachable.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

// =============================================================================
// Collection Port
// =============================================================================

/// Describes one domain collection: its entity type, its normalizer and its
/// pagination cap.
pub trait Collection: Send + Sync + 'static {
    /// Normalized entity
    type Entity: Clone + Debug + Serialize + Send + Sync + 'static;

    /// Name used in logs, errors and events
    const NAME: &'static str;

    /// Maximum number of pages fetched per refresh
    const PAGE_CEILING: usize;

    /// Map one raw record to one entity. Pure.
    fn normalize(record: &RawRecord) -> Result<Self::Entity>;

    /// Stable identifier of an entity.
    fn entity_id(entity: &Self::Entity) -> &str;
}

// =============================================================================
// Event Publisher Port
// =============================================================================

/// Port for publishing domain events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a domain event.
    async fn publish(&self, event: DomainEvent) -> Result<()>;

    /// Publish multiple events.
    async fn publish_all(&self, events: Vec<DomainEvent>) -> Result<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
