//! Shelf
//!
//! Owns one cache per collection over a shared page source. The serving
//! layer receives a `Shelf` at construction; there is no global cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::adapters::LoggingEventPublisher;
use crate::cache::{BookCache, CacheStats, RecipeTagCache};
use crate::config::{DeploymentMode, ShelfConfig};
use crate::domain::{EventPublisher, PageSource};
use crate::error::Result;

/// State of one collection cache, as reported by the admin endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStatus {
    pub collection: &'static str,
    pub database_id: String,
    pub populated: bool,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// Seconds since the stored entry was captured.
    pub age_seconds: Option<u64>,
    pub stats: CacheStats,
}

/// Both collection caches.
pub struct Shelf {
    mode: DeploymentMode,
    source: Arc<dyn PageSource>,
    books: BookCache,
    recipe_tags: RecipeTagCache,
}

impl Shelf {
    /// Build a shelf publishing events to the log.
    pub fn new(config: ShelfConfig, source: Arc<dyn PageSource>) -> Result<Self> {
        Self::with_events(config, source, Arc::new(LoggingEventPublisher::new()))
    }

    /// Build a shelf publishing events to `events`.
    pub fn with_events(
        config: ShelfConfig,
        source: Arc<dyn PageSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Result<Self> {
        config.validate()?;

        let books = BookCache::new(
            source.clone(),
            config.books_database_id.clone(),
            config.cache.clone(),
        )?
        .with_events(events.clone());

        let recipe_tags = RecipeTagCache::new(
            source.clone(),
            config.recipe_tags_database_id.clone(),
            config.cache.clone(),
        )?
        .with_events(events);

        info!(
            mode = %config.mode,
            max_age_secs = config.cache.max_age.as_secs(),
            page_size = config.cache.page_size,
            "Shelf initialized"
        );

        Ok(Self {
            mode: config.mode,
            source,
            books,
            recipe_tags,
        })
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn books(&self) -> &BookCache {
        &self.books
    }

    pub fn recipe_tags(&self) -> &RecipeTagCache {
        &self.recipe_tags
    }

    /// Clear both caches.
    pub async fn clear_all(&self) {
        self.books.clear().await;
        self.recipe_tags.clear().await;
    }

    /// Per-collection cache state.
    pub fn status(&self) -> Vec<CollectionStatus> {
        vec![
            CollectionStatus {
                collection: self.books.name(),
                database_id: self.books.collection_id().to_string(),
                populated: self.books.is_populated(),
                last_refreshed_at: self.books.last_refreshed_at(),
                age_seconds: self.books.entry_age().map(|age| age.as_secs()),
                stats: self.books.stats(),
            },
            CollectionStatus {
                collection: self.recipe_tags.name(),
                database_id: self.recipe_tags.collection_id().to_string(),
                populated: self.recipe_tags.is_populated(),
                last_refreshed_at: self.recipe_tags.last_refreshed_at(),
                age_seconds: self.recipe_tags.entry_age().map(|age| age.as_secs()),
                stats: self.recipe_tags.stats(),
            },
        ]
    }

    /// Whether the upstream source is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        self.source.health_check().await
    }
}

impl std::fmt::Debug for Shelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shelf")
            .field("mode", &self.mode)
            .field("books", &self.books)
            .field("recipe_tags", &self.recipe_tags)
            .finish()
    }
}
