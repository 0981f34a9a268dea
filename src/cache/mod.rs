//! Collection Cache
//!
//! Read-through, single-slot caches over the paged upstream source.
//!
//! ```text
//! read ──▶ RefreshPolicy ──serve──▶ CacheEntry
//!               │
//!          empty/stale
//!               ▼
//!          Paginator ──▶ Collection::normalize ──▶ new CacheEntry (swap)
//! ```
//!
//! A refresh is all-or-nothing: if any page fails or any record does not
//! normalize, the stored entry is left exactly as it was.

mod collection;
mod entry;
mod metrics;
mod paginator;
mod policy;

pub use collection::CollectionCache;
pub use entry::CacheEntry;
pub use metrics::{CacheMetrics, CacheStats};
pub use paginator::{FetchedPages, Paginator, StopReason};
pub use policy::{RefreshDecision, RefreshPolicy};

use crate::normalize::{Books, RecipeTags};

/// Cache over the bookshelf database.
pub type BookCache = CollectionCache<Books>;

/// Cache over the recipe tags database.
pub type RecipeTagCache = CollectionCache<RecipeTags>;
