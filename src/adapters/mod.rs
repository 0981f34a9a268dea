//! Infrastructure Adapters
//!
//! Adapter implementations for the domain ports.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │            PageSource │ EventPublisher (Ports)                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  NotionClient │ InMemoryPageSource                               │
//! │  LoggingEventPublisher │ InMemoryEventCollector                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod event_publisher;
mod in_memory;
mod notion;

pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher};
pub use in_memory::InMemoryPageSource;
pub use notion::NotionClient;
