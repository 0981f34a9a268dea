//! Normalizer
//!
//! Maps raw Notion page objects onto domain entities. Each collection has a
//! descriptor type implementing [`Collection`](crate::domain::Collection):
//!
//! - [`Books`] - strict: every field except the rating is required
//! - [`RecipeTags`] - the recipe relation defaults to empty when absent
//!
//! Normalization is a pure function of one record. A failure is reported as
//! [`Error::Validation`] and aborts the enclosing refresh.

mod book;
mod recipe_tag;

#[cfg(test)]
mod proptest;

pub use book::Books;
pub use recipe_tag::RecipeTags;

use serde::Deserialize;

use crate::domain::RawRecord;
use crate::error::{Error, Result};

// =============================================================================
// Shared Notion Property Shapes
// =============================================================================

/// One rich-text run.
#[derive(Debug, Deserialize)]
pub(crate) struct RichText {
    #[serde(default)]
    pub plain_text: Option<String>,
}

/// A `title` property.
#[derive(Debug, Deserialize)]
pub(crate) struct TitleProperty {
    #[serde(default)]
    pub title: Option<Vec<RichText>>,
}

impl TitleProperty {
    pub fn text(&self) -> Option<&str> {
        self.title.as_deref().and_then(first_plain_text)
    }
}

/// A reference inside a `relation` property.
#[derive(Debug, Deserialize)]
pub(crate) struct RelationRef {
    pub id: String,
}

/// A `relation` property.
#[derive(Debug, Deserialize)]
pub(crate) struct RelationProperty {
    #[serde(default)]
    pub relation: Option<Vec<RelationRef>>,
}

/// Text of the first run, if it is non-empty.
pub(crate) fn first_plain_text(runs: &[RichText]) -> Option<&str> {
    runs.first()
        .and_then(|run| run.plain_text.as_deref())
        .filter(|text| !text.is_empty())
}

/// Best-effort id of a raw record, for error messages.
pub(crate) fn record_id(record: &RawRecord) -> &str {
    record
        .get("id")
        .and_then(|id| id.as_str())
        .unwrap_or("<unknown>")
}

/// Database id from the record's `parent`, if it has one.
pub(crate) fn parent_database_id(record: &RawRecord) -> Option<&str> {
    record
        .pointer("/parent/database_id")
        .and_then(|id| id.as_str())
}

/// Whether `record` is a page of database `database_id`. Notion ids are
/// compared without hyphens and case-insensitively.
pub(crate) fn belongs_to(record: &RawRecord, database_id: &str) -> bool {
    parent_database_id(record).is_some_and(|parent| same_notion_id(parent, database_id))
}

fn same_notion_id(a: &str, b: &str) -> bool {
    let bare = |id: &str| {
        id.chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect::<String>()
    };
    bare(a) == bare(b)
}

/// Deserialize `record` into the collection's raw shape, reporting shape
/// mismatches as validation errors.
pub(crate) fn decode<'a, T: Deserialize<'a>>(collection: &str, record: &'a RawRecord) -> Result<T> {
    T::deserialize(record).map_err(|e| {
        Error::validation(
            collection,
            record_id(record),
            format!("unexpected shape: {}", e),
        )
    })
}

/// Unwrap a required field or fail with a validation error naming it.
pub(crate) fn require<T>(
    value: Option<T>,
    collection: &str,
    record_id: &str,
    field: &str,
) -> Result<T> {
    value.ok_or_else(|| Error::validation(collection, record_id, format!("missing {}", field)))
}
