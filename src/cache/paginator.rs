//! Paginator
//!
//! Drives a [`PageSource`] from the first page until it reports no more
//! pages, the page ceiling is reached, or it stops handing out usable
//! continuation tokens. Any page failure aborts the whole run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::{PageSource, RawRecord};
use crate::error::{Error, Result};

/// Why pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source reported no further pages
    Exhausted,
    /// The page ceiling was reached while the source still had more
    Ceiling,
    /// The source claimed more pages but gave no usable cursor
    BadCursor,
}

/// Records gathered by one pagination run.
#[derive(Debug, Clone)]
pub struct FetchedPages {
    /// Raw records in source order, first page first
    pub records: Vec<RawRecord>,
    /// Number of pages fetched
    pub pages: usize,
    /// When the last fetched page started being read
    pub last_page_started_at: DateTime<Utc>,
    pub stop_reason: StopReason,
}

/// Paginates one upstream collection.
pub struct Paginator<'a> {
    source: &'a dyn PageSource,
    collection: &'static str,
    collection_id: &'a str,
    page_size: u32,
    page_ceiling: usize,
    page_timeout: Duration,
}

impl<'a> Paginator<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        collection: &'static str,
        collection_id: &'a str,
        page_size: u32,
        page_ceiling: usize,
        page_timeout: Duration,
    ) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::Config("page size must be greater than zero".into()));
        }
        if page_ceiling == 0 {
            return Err(Error::Config("page ceiling must be greater than zero".into()));
        }

        Ok(Self {
            source,
            collection,
            collection_id,
            page_size,
            page_ceiling,
            page_timeout,
        })
    }

    /// Fetch pages until one of the stop conditions holds.
    pub async fn fetch_all(&self) -> Result<FetchedPages> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            let started_at = Utc::now();
            let page = self.fetch_page(cursor.as_deref()).await?;
            pages += 1;

            debug!(
                collection = self.collection,
                page = pages,
                records = page.records.len(),
                has_more = page.has_more,
                "Fetched page"
            );
            records.extend(page.records);

            let stop_reason = if !page.has_more {
                Some(StopReason::Exhausted)
            } else if pages >= self.page_ceiling {
                Some(StopReason::Ceiling)
            } else {
                match page.next_cursor.filter(|next| !next.trim().is_empty()) {
                    Some(next) if cursor.as_deref() != Some(next.as_str()) => {
                        cursor = Some(next);
                        None
                    }
                    other => {
                        warn!(
                            collection = self.collection,
                            cursor = ?other,
                            "Source reported more pages without a usable cursor, treating as exhausted"
                        );
                        Some(StopReason::BadCursor)
                    }
                }
            };

            if let Some(stop_reason) = stop_reason {
                return Ok(FetchedPages {
                    records,
                    pages,
                    last_page_started_at: started_at,
                    stop_reason,
                });
            }
        }
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<crate::domain::RawPage> {
        let query = self
            .source
            .query(self.collection_id, self.page_size, cursor);

        tokio::time::timeout(self.page_timeout, query)
            .await
            .map_err(|_| Error::SourceTimeout {
                collection: self.collection.to_string(),
                timeout: self.page_timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryPageSource;
    use crate::error::ErrorKind;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn records(n: usize) -> Vec<RawRecord> {
        (0..n).map(|i| json!({"id": format!("rec-{}", i)})).collect()
    }

    fn ids(fetched: &FetchedPages) -> Vec<String> {
        fetched
            .records
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect()
    }

    fn paginator<'a>(source: &'a InMemoryPageSource, ceiling: usize) -> Paginator<'a> {
        Paginator::new(source, "books", "db", 10, ceiling, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_concatenates_pages_in_order() {
        let source = InMemoryPageSource::new().with_records("db", records(12));

        let fetched = paginator(&source, 3).fetch_all().await.unwrap();

        assert_eq!(fetched.pages, 2);
        assert_eq!(fetched.stop_reason, StopReason::Exhausted);
        assert_eq!(ids(&fetched), (0..12).map(|i| format!("rec-{}", i)).collect::<Vec<_>>());
        assert_eq!(source.query_count("db"), 2);
    }

    #[tokio::test]
    async fn test_single_page() {
        let source = InMemoryPageSource::new().with_records("db", records(4));

        let fetched = paginator(&source, 3).fetch_all().await.unwrap();
        assert_eq!(fetched.pages, 1);
        assert_eq!(fetched.records.len(), 4);
    }

    #[tokio::test]
    async fn test_stops_at_ceiling_when_source_never_ends() {
        let source = InMemoryPageSource::new().with_records("db", records(5));
        source.set_endless("db", true);

        let fetched = paginator(&source, 3).fetch_all().await.unwrap();

        assert_eq!(fetched.pages, 3);
        assert_eq!(fetched.stop_reason, StopReason::Ceiling);
        assert_eq!(source.query_count("db"), 3);
        assert_eq!(fetched.records.len(), 5);
    }

    #[tokio::test]
    async fn test_ceiling_bounds_record_count() {
        let source = InMemoryPageSource::new().with_records("db", records(100));

        let fetched = paginator(&source, 2).fetch_all().await.unwrap();
        assert_eq!(fetched.records.len(), 20);
        assert_eq!(fetched.stop_reason, StopReason::Ceiling);
    }

    #[tokio::test]
    async fn test_missing_cursor_stops() {
        let source = InMemoryPageSource::new().with_records("db", records(30));
        source.set_drop_cursor("db", true);

        let fetched = paginator(&source, 3).fetch_all().await.unwrap();

        assert_eq!(fetched.pages, 1);
        assert_eq!(fetched.stop_reason, StopReason::BadCursor);
        assert_eq!(fetched.records.len(), 10);
    }

    #[tokio::test]
    async fn test_page_failure_aborts() {
        let source = InMemoryPageSource::new().with_records("db", records(30));
        source.fail_page("db", 1, "rate limited");

        let err = paginator(&source, 3).fetch_all().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert_eq!(source.query_count("db"), 2);
    }

    #[tokio::test]
    async fn test_page_timeout() {
        let source = InMemoryPageSource::new().with_records("db", records(3));
        source.set_delay(Some(Duration::from_millis(200)));

        let paginator =
            Paginator::new(&source, "books", "db", 10, 3, Duration::from_millis(20)).unwrap();
        let err = paginator.fetch_all().await.unwrap_err();

        assert_matches!(err, Error::SourceTimeout { ref collection, .. } if collection == "books");
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[tokio::test]
    async fn test_last_page_timestamp() {
        let source = InMemoryPageSource::new().with_records("db", records(25));
        let before = Utc::now();

        let fetched = paginator(&source, 3).fetch_all().await.unwrap();

        assert!(fetched.last_page_started_at >= before);
        assert!(fetched.last_page_started_at <= Utc::now());
    }

    #[test]
    fn test_rejects_bad_limits() {
        let source = InMemoryPageSource::new();
        assert!(Paginator::new(&source, "books", "db", 0, 3, Duration::from_secs(1)).is_err());
        assert!(Paginator::new(&source, "books", "db", 10, 0, Duration::from_secs(1)).is_err());
    }
}
