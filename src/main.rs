//! Notion Shelf
//!
//! Serves the bookshelf and recipe tags Notion databases over HTTP from
//! time-bounded caches.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Notion Shelf                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │  API Server  │───▶│    Shelf     │───▶│ NotionClient │       │
//! │  │   (hyper)    │    │   (caches)   │    │  (reqwest)   │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notion_shelf::adapters::NotionClient;
use notion_shelf::config::{CacheConfig, DeploymentMode, NotionConfig, ShelfConfig};
use notion_shelf::domain::PageSource;
use notion_shelf::error::Result;
use notion_shelf::{server, Shelf};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Notion Shelf - cached query API over Notion databases
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Notion integration token
    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    notion_api_key: String,

    /// Notion API base URL
    #[arg(long, env = "NOTION_BASE_URL", default_value = "https://api.notion.com")]
    notion_base_url: String,

    /// Bookshelf database id
    #[arg(long, env = "NOTION_BOOKSHELF_ID")]
    books_database_id: String,

    /// Recipe tags database id
    #[arg(long, env = "NOTION_RECIPE_TAGS_ID")]
    recipe_tags_database_id: String,

    /// Deployment mode (selects the cache max-age)
    #[arg(long, env = "APP_ENV", value_enum, default_value_t = DeploymentMode::Development)]
    mode: DeploymentMode,

    /// Records requested per upstream page
    #[arg(long, env = "PAGE_SIZE", default_value = "10")]
    page_size: u32,

    /// Timeout for a single upstream page fetch, in seconds
    #[arg(long, env = "PAGE_TIMEOUT_SECONDS", default_value = "30")]
    page_timeout_seconds: u64,

    /// API server bind address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let page_timeout = Duration::from_secs(args.page_timeout_seconds);

    info!("Starting Notion Shelf");
    info!("  Mode: {}", args.mode);
    info!("  Cache max-age: {:?}", args.mode.cache_max_age());
    info!("  Page size: {}", args.page_size);
    info!("  Page timeout: {:?}", page_timeout);
    if !args.mode.is_production() {
        warn!("Development mode: entries expire after {:?}", args.mode.cache_max_age());
    }

    let client = NotionClient::new(NotionConfig {
        base_url: args.notion_base_url.clone(),
        api_key: args.notion_api_key.clone(),
        request_timeout: page_timeout,
        ..Default::default()
    })?;

    // Check Notion health
    match client.health_check().await {
        Ok(true) => info!("Notion connection healthy"),
        Ok(false) => warn!("Notion health check reported unhealthy"),
        Err(e) => {
            error!("Notion health check failed: {}", e);
            error!("Continuing anyway - reads will fail until Notion is reachable");
        }
    }

    let config = ShelfConfig {
        cache: CacheConfig::for_mode(args.mode)
            .with_page_size(args.page_size)
            .with_page_timeout(page_timeout),
        ..ShelfConfig::new(
            args.mode,
            args.books_database_id.clone(),
            args.recipe_tags_database_id.clone(),
        )
    };

    let shelf = Arc::new(Shelf::new(config, Arc::new(client))?);

    tokio::select! {
        result = server::serve(shelf, &args.listen_addr) => {
            if let Err(e) = &result {
                error!("API server error: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
