//! Notion Shelf - cached query API over Notion databases
//!
//! Fetches two Notion databases (a bookshelf and a set of recipe tags),
//! normalizes their pages into domain entities and serves them from
//! per-collection, time-bounded caches.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐    ┌────────────────────────────────────────────┐    ┌────────┐
//! │  server  │───▶│  Shelf                                     │───▶│ Notion │
//! │ (hyper)  │    │  CollectionCache<Books>                    │    │  API   │
//! └──────────┘    │  CollectionCache<RecipeTags>               │    └────────┘
//!                 │    RefreshPolicy → Paginator → normalize   │
//!                 └────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Notion HTTP client, in-memory source, event publishers
//! - [`cache`] - Paginator, cache entries, refresh policy, collection caches
//! - [`config`] - Configuration types and deployment mode
//! - [`domain`] - Entities, ports and domain events
//! - [`error`] - Error types
//! - [`normalize`] - Raw Notion page to entity mapping
//! - [`server`] - JSON-over-HTTP serving layer
//! - [`shelf`] - Facade owning both caches

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod server;
pub mod shelf;

// Re-export commonly used types
pub use cache::{BookCache, CacheStats, CollectionCache, RecipeTagCache};
pub use config::{CacheConfig, DeploymentMode, NotionConfig, ShelfConfig};
pub use domain::{Book, BookStatus, Rating, RecipeTag};
pub use error::{Error, ErrorKind, Result};
pub use shelf::Shelf;
