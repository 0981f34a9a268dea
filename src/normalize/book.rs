//! Book normalization
//!
//! The bookshelf database stores the author twice: the `Author` relation
//! holds the author page id, while `Author Name` is a rollup that may
//! aggregate several authors. Only the first entry of each is used, and the
//! two are read independently.

use chrono::NaiveDate;
use serde::Deserialize;

use super::{decode, first_plain_text, require, RelationProperty, RichText, TitleProperty};
use crate::domain::{Book, BookStatus, Collection, Rating, RawRecord};
use crate::error::{Error, Result};

/// Select value meaning "not rated yet".
const UNRATED: &str = "TBD";

// =============================================================================
// Raw Shape
// =============================================================================

#[derive(Debug, Deserialize)]
struct BookRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: Option<BookProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct BookProperties {
    #[serde(rename = "Title", default)]
    title: Option<TitleProperty>,
    #[serde(rename = "Status", default)]
    status: Option<StatusProperty>,
    #[serde(rename = "Rate", default)]
    rate: Option<SelectProperty>,
    #[serde(rename = "Author", default)]
    author: Option<RelationProperty>,
    #[serde(rename = "Author Name", default)]
    author_name: Option<RollupProperty>,
    #[serde(rename = "Reading", default)]
    reading: Option<RichTextProperty>,
    #[serde(rename = "Date_Read", default)]
    date_read: Option<DateProperty>,
}

#[derive(Debug, Deserialize)]
struct NamedOption {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StatusProperty {
    #[serde(default)]
    status: Option<NamedOption>,
}

#[derive(Debug, Deserialize)]
struct SelectProperty {
    #[serde(default)]
    select: Option<NamedOption>,
}

#[derive(Debug, Deserialize)]
struct RollupProperty {
    #[serde(default)]
    rollup: Option<RollupValue>,
}

#[derive(Debug, Deserialize)]
struct RollupValue {
    #[serde(default)]
    array: Vec<TitleProperty>,
}

#[derive(Debug, Deserialize)]
struct RichTextProperty {
    #[serde(default)]
    rich_text: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
struct DateProperty {
    #[serde(default)]
    date: Option<DateValue>,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    #[serde(default)]
    start: Option<String>,
}

// =============================================================================
// Collection
// =============================================================================

/// The books collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Books;

impl Collection for Books {
    type Entity = Book;

    const NAME: &'static str = "books";
    const PAGE_CEILING: usize = 3;

    fn normalize(record: &RawRecord) -> Result<Book> {
        let raw: BookRecord = decode(Self::NAME, record)?;

        let id = require(
            raw.id.filter(|id| !id.is_empty()),
            Self::NAME,
            "<unknown>",
            "id",
        )?;
        let props = raw.properties.unwrap_or_default();

        let title = require(
            props.title.as_ref().and_then(TitleProperty::text),
            Self::NAME,
            &id,
            "Title",
        )?
        .to_string();

        let status_name = require(
            props.status.as_ref().and_then(|s| s.status.as_ref()),
            Self::NAME,
            &id,
            "Status",
        )?;
        let status: BookStatus = status_name
            .name
            .parse()
            .map_err(|reason: String| Error::validation(Self::NAME, &id, reason))?;

        let rating = match props.rate.as_ref().and_then(|r| r.select.as_ref()) {
            Some(option) => parse_rating(&option.name)
                .map_err(|reason| Error::validation(Self::NAME, &id, reason))?,
            None => None,
        };

        let author_name = require(
            props
                .author_name
                .as_ref()
                .and_then(|p| p.rollup.as_ref())
                .and_then(|rollup| rollup.array.first())
                .and_then(TitleProperty::text),
            Self::NAME,
            &id,
            "Author Name",
        )?
        .to_string();

        let author_id = require(
            props
                .author
                .as_ref()
                .and_then(|p| p.relation.as_deref())
                .and_then(|refs| refs.first())
                .map(|r| r.id.clone()),
            Self::NAME,
            &id,
            "Author",
        )?;

        let reading = props
            .reading
            .as_ref()
            .and_then(|p| first_plain_text(&p.rich_text))
            .map(str::to_string);

        let date_read = props
            .date_read
            .as_ref()
            .and_then(|p| p.date.as_ref())
            .and_then(|d| d.start.as_deref())
            .and_then(parse_date);

        Ok(Book {
            id,
            title,
            status,
            rating,
            author_name,
            author_id,
            reading,
            date_read,
        })
    }

    fn entity_id(entity: &Book) -> &str {
        &entity.id
    }
}

/// Parse a `Rate` select name. `TBD` means unrated.
pub(crate) fn parse_rating(name: &str) -> std::result::Result<Option<Rating>, String> {
    let name = name.trim();
    if name.eq_ignore_ascii_case(UNRATED) {
        return Ok(None);
    }
    name.parse::<u8>()
        .ok()
        .and_then(Rating::new)
        .map(Some)
        .ok_or_else(|| format!("invalid rating '{}'", name))
}

/// Dates may carry a time component; only the calendar day is kept.
fn parse_date(start: &str) -> Option<NaiveDate> {
    let day = start.get(..10).unwrap_or(start);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
