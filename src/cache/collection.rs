//! Collection Cache
//!
//! Single-slot, replace-on-refresh cache for one domain collection.
//!
//! # Concurrency
//!
//! The slot sits behind a `parking_lot::RwLock` and is only ever swapped
//! whole; readers clone the entry (an `Arc` bump) and never observe a partial
//! update. Refreshes are serialized by an async gate. A reader that finds the
//! entry empty or stale takes the gate and looks again before fetching, so
//! readers queued behind an in-flight refresh share its result instead of
//! fetching again. Failed refreshes are not shared: the next reader through
//! the gate makes its own attempt.
//!
//! A refresh runs on its own task, which owns the gate until the result is
//! installed. A reader that stops waiting (dropped request, timeout, aborted
//! task) does not cancel it.
//!
//! `clear()` bumps a generation counter. A refresh that started before a
//! clear still returns its data to the reader that triggered it, but does not
//! install it, so the next read refreshes again.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn, Instrument};

use super::entry::CacheEntry;
use super::metrics::{CacheMetrics, CacheStats};
use super::paginator::{Paginator, StopReason};
use super::policy::RefreshPolicy;
use crate::adapters::LoggingEventPublisher;
use crate::config::CacheConfig;
use crate::domain::{Book, BookStatus, Collection, DomainEvent, EventPublisher, PageSource};
use crate::error::{Error, Result};
use crate::normalize::{self, Books};

struct Slot<T> {
    entry: Option<CacheEntry<T>>,
    generation: u64,
}

/// State shared between the cache handle and its refresh tasks.
struct CacheCore<C: Collection> {
    source: Arc<dyn PageSource>,
    collection_id: String,
    config: CacheConfig,
    policy: RefreshPolicy,
    slot: RwLock<Slot<C::Entity>>,
    metrics: CacheMetrics,
    events: RwLock<Arc<dyn EventPublisher>>,
    _collection: PhantomData<fn() -> C>,
}

/// Cache for one collection `C`.
pub struct CollectionCache<C: Collection> {
    core: Arc<CacheCore<C>>,
    refresh_gate: Arc<Mutex<()>>,
}

impl<C: Collection> CollectionCache<C> {
    /// Create an empty cache over `collection_id` in `source`.
    pub fn new(
        source: Arc<dyn PageSource>,
        collection_id: impl Into<String>,
        config: CacheConfig,
    ) -> Result<Self> {
        config.validate()?;

        let core = CacheCore {
            source,
            collection_id: collection_id.into(),
            policy: RefreshPolicy::new(config.max_age),
            config,
            slot: RwLock::new(Slot {
                entry: None,
                generation: 0,
            }),
            metrics: CacheMetrics::new(),
            events: RwLock::new(Arc::new(LoggingEventPublisher::new())),
            _collection: PhantomData,
        };

        Ok(Self {
            core: Arc::new(core),
            refresh_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Replace the event publisher.
    pub fn with_events(self, events: Arc<dyn EventPublisher>) -> Self {
        *self.core.events.write() = events;
        self
    }

    pub fn name(&self) -> &'static str {
        C::NAME
    }

    pub fn collection_id(&self) -> &str {
        &self.core.collection_id
    }

    pub fn config(&self) -> &CacheConfig {
        &self.core.config
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The whole collection, refreshing first if empty or stale.
    pub async fn get_all(&self) -> Result<Arc<Vec<C::Entity>>> {
        Ok(self.snapshot().await?.items())
    }

    /// The entity with `id`, or [`Error::NotFound`].
    pub async fn get_by_id(&self, id: &str) -> Result<C::Entity> {
        let entry = self.snapshot().await?;
        entry
            .find(|entity| C::entity_id(entity) == id)
            .cloned()
            .ok_or_else(|| Error::not_found(C::NAME, id))
    }

    /// Entities matching `predicate`, in cached order.
    pub async fn get_filtered<P>(&self, predicate: P) -> Result<Vec<C::Entity>>
    where
        P: Fn(&C::Entity) -> bool,
    {
        Ok(self.snapshot().await?.filter(predicate))
    }

    /// Fetch one record straight from the source, bypassing the cache.
    ///
    /// The source may hold pages of other databases; a record whose parent
    /// is not this collection's database is reported as not found.
    #[instrument(skip(self), fields(collection = C::NAME))]
    pub async fn fetch_by_id(&self, id: &str) -> Result<C::Entity> {
        let core = &self.core;
        let record = tokio::time::timeout(core.config.page_timeout, core.source.retrieve(id))
            .await
            .map_err(|_| Error::SourceTimeout {
                collection: C::NAME.to_string(),
                timeout: core.config.page_timeout,
            })?
            .map_err(|e| match e {
                Error::NotFound { .. } => Error::not_found(C::NAME, id),
                other => other,
            })?;

        if !normalize::belongs_to(&record, &core.collection_id) {
            debug!(
                parent = ?normalize::parent_database_id(&record),
                "Record belongs to another database"
            );
            return Err(Error::not_found(C::NAME, id));
        }
        C::normalize(&record)
    }

    /// The current entry, refreshing first if the policy requires it.
    pub async fn snapshot(&self) -> Result<CacheEntry<C::Entity>> {
        if let Some(entry) = self.core.servable_entry() {
            self.core.metrics.record_hit();
            return Ok(entry);
        }

        let gate = Arc::clone(&self.refresh_gate).lock_owned().await;

        // Another reader may have refreshed while we waited.
        if let Some(entry) = self.core.servable_entry() {
            self.core.metrics.record_hit();
            return Ok(entry);
        }

        self.core.metrics.record_miss();
        self.spawn_refresh(gate).await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Refresh unconditionally and return the new entry.
    pub async fn refresh(&self) -> Result<CacheEntry<C::Entity>> {
        let gate = Arc::clone(&self.refresh_gate).lock_owned().await;
        self.spawn_refresh(gate).await
    }

    /// Drop the stored entry; the next read refreshes.
    pub async fn clear(&self) {
        {
            let mut slot = self.core.slot.write();
            slot.entry = None;
            slot.generation += 1;
        }
        self.core.metrics.record_clear();
        info!(collection = C::NAME, "Cache cleared");
        self.core.emit(DomainEvent::cache_cleared(C::NAME)).await;
    }

    /// Capture time of the stored entry, if any.
    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.core
            .slot
            .read()
            .entry
            .as_ref()
            .map(CacheEntry::captured_at)
    }

    /// Age of the stored entry, if any.
    pub fn entry_age(&self) -> Option<Duration> {
        let now = Utc::now();
        self.core.slot.read().entry.as_ref().map(|e| e.age(now))
    }

    pub fn is_populated(&self) -> bool {
        self.core.slot.read().entry.is_some()
    }

    pub fn stats(&self) -> CacheStats {
        self.core.metrics.snapshot()
    }

    /// Run a refresh on its own task. The task holds `gate` until the result
    /// is installed; the caller only waits for the outcome.
    async fn spawn_refresh(&self, gate: OwnedMutexGuard<()>) -> Result<CacheEntry<C::Entity>> {
        let core = Arc::clone(&self.core);
        let task = tokio::spawn(
            async move {
                let result = core.refresh().await;
                drop(gate);
                result
            }
            .in_current_span(),
        );

        task.await
            .map_err(|e| Error::Internal(format!("{} refresh task failed: {}", C::NAME, e)))?
    }
}

impl<C: Collection> CacheCore<C> {
    fn servable_entry(&self) -> Option<CacheEntry<C::Entity>> {
        let slot = self.slot.read();
        let decision = self.policy.decide(slot.entry.as_ref(), Utc::now());
        if decision.needs_refresh() {
            debug!(collection = C::NAME, %decision, "Entry not servable");
            None
        } else {
            slot.entry.clone()
        }
    }

    /// Run the fetch-normalize pipeline and install the result.
    /// Callers must hold the refresh gate.
    #[instrument(skip(self), fields(collection = C::NAME, collection_id = %self.collection_id))]
    async fn refresh(&self) -> Result<CacheEntry<C::Entity>> {
        let generation = self.slot.read().generation;
        let started = Instant::now();

        let entry = match self.build_entry().await {
            Ok(entry) => entry,
            Err(e) => {
                self.metrics.record_refresh_failure();
                warn!(error = %e, "Refresh failed, keeping previous entry");
                self.emit(DomainEvent::cache_refresh_failed(C::NAME, e.to_string()))
                    .await;
                return Err(e);
            }
        };

        self.metrics.record_refresh(entry.pages(), entry.len());

        let installed = {
            let mut slot = self.slot.write();
            if slot.generation == generation {
                slot.entry = Some(entry.clone());
                true
            } else {
                false
            }
        };

        if installed {
            info!(
                records = entry.len(),
                pages = entry.pages(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Cache refreshed"
            );
            self.emit(DomainEvent::cache_refreshed(
                C::NAME,
                entry.len(),
                entry.pages(),
                entry.captured_at(),
                started.elapsed(),
            ))
            .await;
        } else {
            self.metrics.record_discarded_refresh();
            info!(
                records = entry.len(),
                "Cache cleared during refresh, result not installed"
            );
            self.emit(DomainEvent::cache_refresh_discarded(C::NAME, entry.len()))
                .await;
        }

        Ok(entry)
    }

    async fn build_entry(&self) -> Result<CacheEntry<C::Entity>> {
        let paginator = Paginator::new(
            self.source.as_ref(),
            C::NAME,
            &self.collection_id,
            self.config.page_size,
            C::PAGE_CEILING,
            self.config.page_timeout,
        )?;
        let fetched = paginator.fetch_all().await?;

        if fetched.stop_reason == StopReason::Ceiling {
            info!(pages = fetched.pages, "Page ceiling reached, source has more");
            self.emit(DomainEvent::pagination_capped(C::NAME, fetched.pages))
                .await;
        }

        let items = fetched
            .records
            .iter()
            .map(C::normalize)
            .collect::<Result<Vec<_>>>()?;

        Ok(CacheEntry::new(
            items,
            fetched.last_page_started_at,
            fetched.pages,
        ))
    }

    async fn emit(&self, event: DomainEvent) {
        let events = self.events.read().clone();
        if let Err(e) = events.publish(event).await {
            warn!(collection = C::NAME, error = %e, "Failed to publish cache event");
        }
    }
}

impl CollectionCache<Books> {
    /// Books with the given reading status, in cached order.
    pub async fn get_by_status(&self, status: BookStatus) -> Result<Vec<Book>> {
        self.get_filtered(|book| book.has_status(status)).await
    }
}

impl<C: Collection> std::fmt::Debug for CollectionCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionCache")
            .field("collection", &C::NAME)
            .field("collection_id", &self.core.collection_id)
            .field("max_age", &self.core.config.max_age)
            .field("populated", &self.is_populated())
            .finish()
    }
}
