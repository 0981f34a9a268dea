//! Domain Entities
//!
//! The normalized, strongly-shaped records served to callers. Nothing in here
//! knows about the upstream schema; see [`crate::normalize`] for that.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Book
// =============================================================================

/// Reading status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Read,
    Reading,
    Unread,
}

impl BookStatus {
    pub const ALL: [BookStatus; 3] = [BookStatus::Read, BookStatus::Reading, BookStatus::Unread];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Read => "read",
            BookStatus::Reading => "reading",
            BookStatus::Unread => "unread",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    /// Case-insensitive; the upstream board has used both `Read` and `read`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(BookStatus::Read),
            "reading" => Ok(BookStatus::Reading),
            "unread" => Ok(BookStatus::Unread),
            other => Err(format!("unknown book status '{}'", other)),
        }
    }
}

/// Star rating, 0 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    /// Returns `None` for values above [`Rating::MAX`].
    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// A book on the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub status: BookStatus,
    /// `None` means unrated, which is distinct from a zero rating
    pub rating: Option<Rating>,
    pub author_name: String,
    /// Reference to the author record; not resolved further
    pub author_id: String,
    /// Free-text reading note
    pub reading: Option<String>,
    pub date_read: Option<NaiveDate>,
}

impl Book {
    pub fn has_status(&self, status: BookStatus) -> bool {
        self.status == status
    }
}

// =============================================================================
// Recipe Tag
// =============================================================================

/// A tag grouping recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeTag {
    pub id: String,
    pub title: String,
    /// Recipe ids in upstream order; may be empty
    pub related_recipes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_status_parse() {
        assert_eq!("read".parse::<BookStatus>().unwrap(), BookStatus::Read);
        assert_eq!("Reading".parse::<BookStatus>().unwrap(), BookStatus::Reading);
        assert_eq!(" UNREAD ".parse::<BookStatus>().unwrap(), BookStatus::Unread);
        assert!("abandoned".parse::<BookStatus>().is_err());
    }

    #[test]
    fn test_book_status_display_roundtrips() {
        for status in BookStatus::ALL {
            assert_eq!(status.to_string().parse::<BookStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert_eq!(Rating::new(0).map(|r| r.value()), Some(0));
        assert_eq!(Rating::new(5).map(|r| r.value()), Some(5));
        assert!(Rating::new(6).is_none());
        assert_eq!(Rating::new(4).unwrap().to_string(), "4/5");
    }

    #[test]
    fn test_book_serializes_camel_case() {
        let book = Book {
            id: "b1".into(),
            title: "Dune".into(),
            status: BookStatus::Read,
            rating: None,
            author_name: "Frank Herbert".into(),
            author_id: "a1".into(),
            reading: None,
            date_read: NaiveDate::from_ymd_opt(2023, 4, 1),
        };

        let json = serde_json::to_string(&book).unwrap();

        assert!(json.contains("\"authorName\":\"Frank Herbert\""));
        assert!(json.contains("\"status\":\"read\""));
        assert!(json.contains("\"rating\":null"));
        assert!(json.contains("\"dateRead\":\"2023-04-01\""));
    }

    #[test]
    fn test_recipe_tag_serializes() {
        let tag = RecipeTag {
            id: "t1".into(),
            title: "Soup".into(),
            related_recipes: vec!["r1".into(), "r2".into()],
        };

        let json = serde_json::to_string(&tag).unwrap();
        assert!(json.contains("\"relatedRecipes\":[\"r1\",\"r2\"]"));
    }
}
