//! In-Memory Page Source
//!
//! Implements the `PageSource` port over records held in memory. Used by the
//! test suites and for running the service without Notion credentials.
//!
//! Cursors are record offsets rendered as strings. Several knobs reproduce
//! upstream misbehaviour: failing a given page, claiming more pages forever,
//! dropping the continuation token, and adding latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use tracing::debug;

use crate::domain::{PageSource, RawPage, RawRecord};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Dataset {
    records: Vec<RawRecord>,
    /// Page index -> failure reason
    failing_pages: HashMap<usize, String>,
    /// Keep reporting `has_more` after the records run out
    endless: bool,
    /// Report `has_more` without a cursor
    drop_cursor: bool,
}

/// Scripted in-memory data source.
#[derive(Debug, Default)]
pub struct InMemoryPageSource {
    datasets: RwLock<HashMap<String, Dataset>>,
    unavailable: RwLock<Option<String>>,
    delay: RwLock<Option<Duration>>,
    query_calls: RwLock<HashMap<String, usize>>,
    retrieve_calls: AtomicUsize,
}

impl InMemoryPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_records`](Self::set_records).
    pub fn with_records(self, collection_id: &str, records: Vec<RawRecord>) -> Self {
        self.set_records(collection_id, records);
        self
    }

    /// Replace the records of a collection, keeping its failure knobs.
    ///
    /// Records without a `parent` get one pointing at `collection_id`, the
    /// way Notion tags every page with its database.
    pub fn set_records(&self, collection_id: &str, records: Vec<RawRecord>) {
        let records = records
            .into_iter()
            .map(|record| with_parent(record, collection_id))
            .collect();
        self.datasets
            .write()
            .entry(collection_id.to_string())
            .or_default()
            .records = records;
    }

    /// Make the page at `page_index` (0-based) fail until [`recover`](Self::recover).
    pub fn fail_page(&self, collection_id: &str, page_index: usize, reason: impl Into<String>) {
        self.datasets
            .write()
            .entry(collection_id.to_string())
            .or_default()
            .failing_pages
            .insert(page_index, reason.into());
    }

    /// Keep reporting more pages after the records run out.
    pub fn set_endless(&self, collection_id: &str, endless: bool) {
        self.datasets
            .write()
            .entry(collection_id.to_string())
            .or_default()
            .endless = endless;
    }

    /// Report `has_more` with no continuation token.
    pub fn set_drop_cursor(&self, collection_id: &str, drop_cursor: bool) {
        self.datasets
            .write()
            .entry(collection_id.to_string())
            .or_default()
            .drop_cursor = drop_cursor;
    }

    /// Fail every call with a source error.
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        *self.unavailable.write() = Some(reason.into());
    }

    /// Clear all injected failures.
    pub fn recover(&self) {
        *self.unavailable.write() = None;
        for dataset in self.datasets.write().values_mut() {
            dataset.failing_pages.clear();
        }
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Number of `query` calls made for a collection.
    pub fn query_count(&self, collection_id: &str) -> usize {
        self.query_calls
            .read()
            .get(collection_id)
            .copied()
            .unwrap_or(0)
    }

    /// Number of `query` calls across all collections.
    pub fn total_query_count(&self) -> usize {
        self.query_calls.read().values().sum()
    }

    /// Number of `retrieve` calls.
    pub fn retrieve_count(&self) -> usize {
        self.retrieve_calls.load(Ordering::Relaxed)
    }

    async fn pause(&self) {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_available(&self) -> Result<()> {
        match self.unavailable.read().as_ref() {
            Some(reason) => Err(Error::SourceUnavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

fn with_parent(mut record: RawRecord, collection_id: &str) -> RawRecord {
    if let Some(fields) = record.as_object_mut() {
        fields
            .entry("parent")
            .or_insert_with(|| json!({"type": "database_id", "database_id": collection_id}));
    }
    record
}

#[async_trait]
impl PageSource for InMemoryPageSource {
    async fn query(
        &self,
        collection_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<RawPage> {
        *self
            .query_calls
            .write()
            .entry(collection_id.to_string())
            .or_default() += 1;

        self.pause().await;
        self.check_available()?;

        let page_size = page_size.max(1) as usize;
        let offset = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| Error::SourceUnavailable(format!("invalid cursor '{}'", cursor)))?,
            None => 0,
        };
        let page_index = offset / page_size;

        let datasets = self.datasets.read();
        let dataset = datasets
            .get(collection_id)
            .ok_or_else(|| Error::SourceUnavailable(format!("unknown database '{}'", collection_id)))?;

        if let Some(reason) = dataset.failing_pages.get(&page_index) {
            return Err(Error::SourceUnavailable(reason.clone()));
        }

        let start = offset.min(dataset.records.len());
        let end = (offset + page_size).min(dataset.records.len());
        let records = dataset.records[start..end].to_vec();
        let has_more = end < dataset.records.len() || dataset.endless;

        debug!(
            collection_id,
            page_index,
            records = records.len(),
            has_more,
            "Serving in-memory page"
        );

        let next_cursor = (has_more && !dataset.drop_cursor).then(|| (offset + page_size).to_string());

        Ok(RawPage {
            records,
            has_more,
            next_cursor,
        })
    }

    async fn retrieve(&self, id: &str) -> Result<RawRecord> {
        self.retrieve_calls.fetch_add(1, Ordering::Relaxed);

        self.pause().await;
        self.check_available()?;

        self.datasets
            .read()
            .values()
            .flat_map(|d| d.records.iter())
            .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
            .cloned()
            .ok_or_else(|| Error::not_found("page", id))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.unavailable.read().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn records(n: usize) -> Vec<RawRecord> {
        (0..n).map(|i| json!({"id": format!("rec-{}", i)})).collect()
    }

    #[tokio::test]
    async fn test_pages_through_records() {
        let source = InMemoryPageSource::new().with_records("db", records(12));

        let first = source.query("db", 10, None).await.unwrap();
        assert_eq!(first.records.len(), 10);
        assert!(first.has_more);
        assert_eq!(first.next_cursor.as_deref(), Some("10"));

        let second = source.query("db", 10, Some("10")).await.unwrap();
        assert_eq!(second.records.len(), 2);
        assert!(!second.has_more);
        assert!(second.next_cursor.is_none());

        assert_eq!(source.query_count("db"), 2);
    }

    #[tokio::test]
    async fn test_endless_and_dropped_cursor() {
        let source = InMemoryPageSource::new().with_records("db", records(1));
        source.set_endless("db", true);

        let page = source.query("db", 10, Some("50")).await.unwrap();
        assert!(page.records.is_empty());
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("60"));

        source.set_drop_cursor("db", true);
        let page = source.query("db", 10, None).await.unwrap();
        assert!(page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_failing_page_and_recover() {
        let source = InMemoryPageSource::new().with_records("db", records(30));
        source.fail_page("db", 1, "rate limited");

        assert!(source.query("db", 10, None).await.is_ok());
        let err = source.query("db", 10, Some("10")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);

        source.recover();
        assert!(source.query("db", 10, Some("10")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let source = InMemoryPageSource::new().with_records("db", records(3));
        source.set_unavailable("network down");

        assert!(source.query("db", 10, None).await.is_err());
        assert!(!source.health_check().await.unwrap());

        source.recover();
        assert!(source.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_retrieve() {
        let source = InMemoryPageSource::new().with_records("db", records(3));

        let record = source.retrieve("rec-2").await.unwrap();
        assert_eq!(record["id"], "rec-2");
        assert_eq!(record["parent"]["database_id"], "db");

        let err = source.retrieve("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(source.retrieve_count(), 2);
    }

    #[tokio::test]
    async fn test_explicit_parent_is_kept() {
        let source = InMemoryPageSource::new().with_records(
            "db",
            vec![json!({"id": "moved", "parent": {"type": "database_id", "database_id": "other"}})],
        );

        let page = source.query("db", 10, None).await.unwrap();
        assert_eq!(page.records[0]["parent"]["database_id"], "other");
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let source = InMemoryPageSource::new();
        let err = source.query("nope", 10, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }
}
