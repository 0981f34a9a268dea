//! Domain Layer
//!
//! - **Entities** (`entities.rs`) - `Book`, `RecipeTag` and their value types
//! - **Ports** (`ports.rs`) - Trait abstractions for the upstream source,
//!   collection descriptors and event publishing
//! - **Events** (`events.rs`) - Cache lifecycle events
//!
//! # Usage
//!
//! ```ignore
//! use notion_shelf::domain::{Collection, PageSource};
//!
//! async fn first_page<C: Collection>(
//!     source: &dyn PageSource,
//!     database_id: &str,
//! ) -> Result<Vec<C::Entity>> {
//!     let page = source.query(database_id, 10, None).await?;
//!     page.records.iter().map(C::normalize).collect()
//! }
//! ```

pub mod entities;
pub mod events;
pub mod ports;

pub use entities::{Book, BookStatus, Rating, RecipeTag};
pub use events::DomainEvent;
pub use ports::{Collection, EventPublisher, PageSource, RawPage, RawRecord};
