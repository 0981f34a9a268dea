//! Configuration
//!
//! Plain configuration structs for the upstream client and the caches. The
//! binary fills these from CLI flags and environment variables.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default number of records requested per upstream page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Default timeout for a single upstream page fetch.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Notion API version sent with every request.
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";

// =============================================================================
// Deployment Mode
// =============================================================================

/// Deployment mode. Selects the cache max-age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DeploymentMode {
    Production,
    #[default]
    Development,
}

impl DeploymentMode {
    /// Max-age of a cache entry in this mode.
    pub fn cache_max_age(&self) -> Duration {
        match self {
            DeploymentMode::Production => Duration::from_secs(60 * 60),
            DeploymentMode::Development => Duration::from_secs(5 * 60),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentMode::Production)
    }
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentMode::Production => write!(f, "production"),
            DeploymentMode::Development => write!(f, "development"),
        }
    }
}

// =============================================================================
// Notion Client
// =============================================================================

/// Configuration for the Notion HTTP client
#[derive(Debug, Clone)]
pub struct NotionConfig {
    /// API base URL
    pub base_url: String,

    /// Integration token
    pub api_key: String,

    /// Value of the `Notion-Version` header
    pub notion_version: String,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.notion.com".to_string(),
            api_key: String::new(),
            notion_version: DEFAULT_NOTION_VERSION.to_string(),
            request_timeout: DEFAULT_PAGE_TIMEOUT,
        }
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Configuration shared by the per-collection caches
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Age after which an entry is stale
    pub max_age: Duration,

    /// Records requested per page
    pub page_size: u32,

    /// Timeout for a single page fetch
    pub page_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::for_mode(DeploymentMode::default())
    }
}

impl CacheConfig {
    /// Defaults for the given deployment mode.
    pub fn for_mode(mode: DeploymentMode) -> Self {
        Self {
            max_age: mode.cache_max_age(),
            page_size: DEFAULT_PAGE_SIZE,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Reject configurations the paginator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page size must be greater than zero".into()));
        }
        if self.page_timeout.is_zero() {
            return Err(Error::Config("page timeout must be greater than zero".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Shelf
// =============================================================================

/// Everything needed to build a [`Shelf`](crate::Shelf)
#[derive(Debug, Clone)]
pub struct ShelfConfig {
    /// Deployment mode
    pub mode: DeploymentMode,

    /// Notion database backing the books collection
    pub books_database_id: String,

    /// Notion database backing the recipe tags collection
    pub recipe_tags_database_id: String,

    /// Cache settings
    pub cache: CacheConfig,
}

impl ShelfConfig {
    pub fn new(
        mode: DeploymentMode,
        books_database_id: impl Into<String>,
        recipe_tags_database_id: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            books_database_id: books_database_id.into(),
            recipe_tags_database_id: recipe_tags_database_id.into(),
            cache: CacheConfig::for_mode(mode),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.books_database_id.trim().is_empty() {
            return Err(Error::Config("books database id is empty".into()));
        }
        if self.recipe_tags_database_id.trim().is_empty() {
            return Err(Error::Config("recipe tags database id is empty".into()));
        }
        self.cache.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_max_age() {
        assert_eq!(
            DeploymentMode::Production.cache_max_age(),
            Duration::from_secs(3600)
        );
        assert_eq!(
            DeploymentMode::Development.cache_max_age(),
            Duration::from_secs(300)
        );
        assert!(DeploymentMode::Production.is_production());
        assert!(!DeploymentMode::default().is_production());
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::for_mode(DeploymentMode::Production);

        assert_eq!(config.max_age, Duration::from_secs(3600));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.page_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_rejects_zero_page_size() {
        let config = CacheConfig::default().with_page_size(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = CacheConfig::default().with_page_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_shelf_config_validation() {
        let config = ShelfConfig::new(DeploymentMode::Development, "books-db", "tags-db");
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.max_age, Duration::from_secs(300));

        let config = ShelfConfig::new(DeploymentMode::Development, " ", "tags-db");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_notion_config_default() {
        let config = NotionConfig::default();
        assert_eq!(config.base_url, "https://api.notion.com");
        assert_eq!(config.notion_version, "2022-06-28");
    }
}
